// src/telegram_ranges.rs
use std::net::IpAddr;
use std::str::FromStr;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;

// Published by Telegram for webhook deliveries.
const TELEGRAM_SUBNETS: [&str; 2] = ["149.154.160.0/20", "91.108.4.0/22"];

lazy_static! {
    static ref TELEGRAM_RANGES: Vec<IpNetwork> = TELEGRAM_SUBNETS
        .iter()
        .filter_map(|range| IpNetwork::from_str(range).ok())
        .collect();
}

pub fn is_telegram_ip(ip: IpAddr) -> bool {
    let ip = match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    };
    TELEGRAM_RANGES.iter().any(|network| network.contains(ip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_telegram_addresses() {
        assert_eq!(TELEGRAM_RANGES.len(), TELEGRAM_SUBNETS.len());
        assert!(is_telegram_ip("149.154.167.220".parse().unwrap()));
        assert!(is_telegram_ip("91.108.6.1".parse().unwrap()));
        assert!(is_telegram_ip("::ffff:149.154.167.220".parse().unwrap()));
        assert!(!is_telegram_ip("1.2.3.4".parse().unwrap()));
        assert!(!is_telegram_ip("::1".parse().unwrap()));
    }
}
