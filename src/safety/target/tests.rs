use super::*;

#[test]
fn allows_private_10() {
    assert!(is_lab_target("10.0.0.5"));
}

#[test]
fn allows_private_172_range() {
    assert!(is_lab_target("172.16.0.1"));
    assert!(is_lab_target("172.31.255.254"));
}

#[test]
fn blocks_172_outside_12_bit_block() {
    assert!(!is_lab_target("172.15.0.1"));
    assert!(!is_lab_target("172.32.0.1"));
}

#[test]
fn allows_private_192_168() {
    assert!(is_lab_target("192.168.1.10"));
}

#[test]
fn allows_loopback() {
    assert!(is_lab_target("127.0.0.1"));
    assert!(is_lab_target("127.1.2.3"));
}

#[test]
fn blocks_public_ip() {
    assert!(!is_lab_target("8.8.8.8"));
    assert!(!is_lab_target("1.1.1.1"));
}

#[test]
fn blocks_ipv6() {
    assert!(!is_lab_target("::1"));
    assert!(!is_lab_target("fe80::1"));
    assert!(!is_lab_target("2001:db8::1"));
}

#[test]
fn allows_lab_hostname() {
    assert!(is_lab_target("target01.lab.internal"));
    assert!(is_lab_target("db.staging.lab.internal"));
}

#[test]
fn blocks_bare_lab_internal_and_lookalikes() {
    assert!(!is_lab_target("lab.internal"));
    assert!(!is_lab_target("evil-lab.internal.example.com"));
    assert!(!is_lab_target("host.lab.internal.example.com"));
}

#[test]
fn blocks_public_hostname() {
    assert!(!is_lab_target("scanme.nmap.org"));
}

#[test]
fn allows_private_cidr() {
    assert!(is_lab_target("192.168.0.0/24"));
    assert!(is_lab_target("10.10.0.0/16"));
    assert!(is_lab_target("127.0.0.0/8"));
}

#[test]
fn blocks_cidr_spanning_public_space() {
    // 0.0.0.0/0 and 8.0.0.0/8 leak outside the lab blocks
    assert!(!is_lab_target("0.0.0.0/0"));
    assert!(!is_lab_target("8.0.0.0/8"));
    // 172.0.0.0/8 contains 172.16/12 but also public space
    assert!(!is_lab_target("172.0.0.0/8"));
}

#[test]
fn blocks_malformed() {
    assert!(!is_lab_target(""));
    assert!(!is_lab_target("not an address"));
    assert!(!is_lab_target("10.0.0.999"));
    assert!(!is_lab_target("10.0.0.0/33"));
}

#[test]
fn cidr_address_counts() {
    let net: Ipv4Net = "10.0.0.0/22".parse().unwrap();
    assert_eq!(address_count(net), 1024);
    let net: Ipv4Net = "10.0.0.0/21".parse().unwrap();
    assert_eq!(address_count(net), 2048);
    let net: Ipv4Net = "10.0.0.0/32".parse().unwrap();
    assert_eq!(address_count(net), 1);
}

#[test]
fn parse_cidr_ignores_plain_hosts() {
    assert!(parse_cidr("10.0.0.5").is_none());
    assert!(parse_cidr("host.lab.internal").is_none());
    assert!(parse_cidr("10.0.0.0/24").is_some());
}
