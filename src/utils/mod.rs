/// Utility functions and helpers
use std::time::Duration;

/// Split a `host:port` address into its host and numeric port.
///
/// Bracketed IPv6 hosts (`[::1]:443`) are returned without brackets.
pub fn split_host_port(addr: &str) -> Result<(&str, u16), String> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| "missing port".to_string())?;

    let host = match host.strip_prefix('[') {
        Some(inner) => inner
            .strip_suffix(']')
            .ok_or_else(|| "unterminated IPv6 bracket".to_string())?,
        None if host.contains(':') => {
            return Err("IPv6 hosts must be bracketed".to_string());
        }
        None => host,
    };

    if host.is_empty() {
        return Err("missing host".to_string());
    }

    let port = port
        .parse::<u16>()
        .map_err(|_| format!("invalid port '{}'", port))?;
    Ok((host, port))
}

/// Format duration for human-readable output
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let secs = duration.as_secs();
    let rem_millis = duration.subsec_millis();
    if secs < 60 {
        if rem_millis == 0 {
            format!("{}s", secs)
        } else {
            format!("{}.{:03}s", secs, rem_millis)
        }
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
