//! Unit and address conversions shared by the reporters

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::FactsError;

/// Byte units, each 1024 times the previous one
pub const BYTE_UNITS: [&str; 5] = ["bytes", "kB", "MiB", "GiB", "TiB"];

/// Scale `bytes` to the largest unit that keeps the value at or above one
#[must_use]
pub fn convert_bytes(bytes: u64) -> (f64, &'static str) {
    let mut value = bytes as f64;
    let mut idx = 0;
    while idx < BYTE_UNITS.len() - 1 && value / 1024.0 >= 1.0 {
        value /= 1024.0;
        idx += 1;
    }
    (value, BYTE_UNITS[idx])
}

/// Human-readable size such as `4.00 GiB`
#[must_use]
pub fn human_bytes(bytes: u64) -> String {
    let (value, unit) = convert_bytes(bytes);
    format!("{value:.2} {unit}")
}

/// Percentage such as `41.20%`
#[must_use]
pub fn percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// `used` as a percentage of `total`, zero for an empty total
#[must_use]
pub fn used_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

/// IPv4 netmask for a prefix length
///
/// # Errors
/// Returns [`FactsError::InvalidAddress`] for prefixes above 32.
pub fn ipv4_netmask(prefix: u8) -> Result<Ipv4Addr, FactsError> {
    if prefix > 32 {
        return Err(FactsError::InvalidAddress(format!(
            "invalid IPv4 prefix length {prefix}"
        )));
    }
    let bits = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    Ok(Ipv4Addr::from(bits))
}

/// IPv6 netmask for a prefix length
///
/// # Errors
/// Returns [`FactsError::InvalidAddress`] for prefixes above 128.
pub fn ipv6_netmask(prefix: u8) -> Result<Ipv6Addr, FactsError> {
    if prefix > 128 {
        return Err(FactsError::InvalidAddress(format!(
            "invalid IPv6 prefix length {prefix}"
        )));
    }
    let bits = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
    Ok(Ipv6Addr::from(bits))
}

/// Netmask of the family of `address`
///
/// # Errors
/// Returns [`FactsError::InvalidAddress`] if the prefix is too long.
pub fn netmask(address: IpAddr, prefix: u8) -> Result<IpAddr, FactsError> {
    Ok(match address {
        IpAddr::V4(_) => IpAddr::V4(ipv4_netmask(prefix)?),
        IpAddr::V6(_) => IpAddr::V6(ipv6_netmask(prefix)?),
    })
}

/// Network address of `address/prefix`
///
/// # Errors
/// Returns [`FactsError::InvalidAddress`] if the prefix is too long.
pub fn network_address(address: IpAddr, prefix: u8) -> Result<IpAddr, FactsError> {
    Ok(match address {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(
            u32::from(v4) & u32::from(ipv4_netmask(prefix)?),
        )),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(
            u128::from(v6) & u128::from(ipv6_netmask(prefix)?),
        )),
    })
}

/// Upper-case the first character
#[must_use]
pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
