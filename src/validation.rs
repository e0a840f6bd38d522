//! IPv4 address and port validation
//!
//! Pure syntactic checks used by the extractors to discard malformed matches.
//! Nothing here allocates or fails: invalid input simply returns `false`.

use std::net::Ipv4Addr;

/// Returns true if `s` is an acceptable IPv4 listing address
///
/// The address must consist of exactly four dot-separated decimal octets in
/// `0..=255`. Addresses in `0.0.0.0/8` and the limited broadcast address are
/// rejected since they can never be dialed.
///
/// # Examples
///
/// ```
/// use ip_harvest::validation::is_valid_ipv4;
///
/// assert!(is_valid_ipv4("192.168.1.1"));
/// assert!(!is_valid_ipv4("0.0.0.1"));
/// assert!(!is_valid_ipv4("255.255.255.255"));
/// assert!(!is_valid_ipv4("256.1.1.1"));
/// assert!(!is_valid_ipv4("1.2.3"));
/// ```
pub fn is_valid_ipv4(s: &str) -> bool {
    parse_ipv4(s).is_some() && !s.starts_with("0.") && s != "255.255.255.255"
}

/// Parses a dotted-quad into an address, reading every octet as decimal
///
/// Unlike [`Ipv4Addr`]'s `FromStr`, leading zeros are accepted (`010` is 10).
/// No reserved-range checks are applied.
pub fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = s.split('.');
    for slot in &mut octets {
        *slot = parse_octet(parts.next()?)?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}

/// Parses one decimal octet, accepting leading zeros
fn parse_octet(part: &str) -> Option<u8> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Leading zeros are legal ("010" == 10) but must not overflow the parse
    let trimmed = part.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some(0);
    }
    if trimmed.len() > 3 {
        return None;
    }
    trimmed.parse::<u16>().ok().and_then(|v| u8::try_from(v).ok())
}

/// Returns true if `s` parses to a port number in `1..=65535`
///
/// # Examples
///
/// ```
/// use ip_harvest::validation::is_valid_port;
///
/// assert!(is_valid_port("443"));
/// assert!(!is_valid_port("0"));
/// assert!(!is_valid_port("65536"));
/// assert!(!is_valid_port("http"));
/// ```
pub fn is_valid_port(s: &str) -> bool {
    parse_port(s).is_some()
}

/// Parses a port number, returning `None` unless it lies in `1..=65535`
pub fn parse_port(s: &str) -> Option<u16> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() || trimmed.len() > 5 {
        return None;
    }
    trimmed.parse::<u32>().ok().and_then(|v| u16::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_ipv4("192.168.1.1"));
        assert!(is_valid_ipv4("1.0.0.1"));
        assert!(is_valid_ipv4("104.16.0.0"));
        assert!(is_valid_ipv4("255.255.255.254"));
        assert!(is_valid_ipv4("10.010.1.1"));
    }

    #[test]
    fn test_reserved_addresses() {
        assert!(!is_valid_ipv4("0.0.0.0"));
        assert!(!is_valid_ipv4("0.0.0.1"));
        assert!(!is_valid_ipv4("0.1.2.3"));
        assert!(!is_valid_ipv4("255.255.255.255"));
    }

    #[test]
    fn test_malformed_addresses() {
        assert!(!is_valid_ipv4(""));
        assert!(!is_valid_ipv4("256.1.1.1"));
        assert!(!is_valid_ipv4("1.2.3"));
        assert!(!is_valid_ipv4("1.2.3.4.5"));
        assert!(!is_valid_ipv4("1..3.4"));
        assert!(!is_valid_ipv4("a.b.c.d"));
        assert!(!is_valid_ipv4("1.2.3.-4"));
        assert!(!is_valid_ipv4(" 1.2.3.4"));
        assert!(!is_valid_ipv4("1.2.3.99999999999999999999"));
    }

    #[test]
    fn test_parse_ipv4() {
        assert_eq!(parse_ipv4("10.010.1.1"), Some(Ipv4Addr::new(10, 10, 1, 1)));
        assert_eq!(parse_ipv4("127.0.0.1"), Some(Ipv4Addr::LOCALHOST));
        assert_eq!(parse_ipv4("1.2.3"), None);
        assert_eq!(parse_ipv4("1.2.3.256"), None);
    }

    #[test]
    fn test_ports() {
        assert!(is_valid_port("1"));
        assert!(is_valid_port("65535"));
        assert!(is_valid_port("08080"));
        assert!(!is_valid_port("0"));
        assert!(!is_valid_port("65536"));
        assert!(!is_valid_port("-1"));
        assert!(!is_valid_port(""));
        assert!(!is_valid_port("80a"));
        assert_eq!(parse_port("1080"), Some(1080));
        assert_eq!(parse_port("123456"), None);
    }
}
