use super::*;

#[test]
fn generated_ports_stay_in_range_and_off_the_blacklist() {
    for _ in 0..1000 {
        let endpoint = Endpoint::generate("host.invalid");
        assert!((PORT_LOW..PORT_HIGH).contains(&endpoint.port));
        assert!(!PORT_BLACKLIST.contains(&endpoint.port));
    }
}

#[test]
fn seeds_are_eight_chars_from_the_fixed_alphabet() {
    for _ in 0..1000 {
        let endpoint = Endpoint::generate("host.invalid");
        assert_eq!(endpoint.socket_seed.len(), SEED_LEN);
        assert!(
            endpoint
                .socket_seed
                .bytes()
                .all(|byte| SEED_ALPHABET.contains(&byte))
        );
    }
}

#[test]
fn socket_numbers_are_short() {
    for _ in 0..1000 {
        let endpoint = Endpoint::generate("host.invalid");
        assert!(endpoint.socket_number < 1000);
    }
}

#[test]
fn url_follows_the_service_template() {
    let endpoint = Endpoint {
        host: "198.51.100.7".to_owned(),
        port: 7003,
        socket_number: 42,
        socket_seed: "abcDEF1_".to_owned(),
    };

    assert_eq!(
        endpoint.url(),
        "ws://198.51.100.7:7003/echoup/42/abcDEF1_/websocket"
    );
}
