use proptest::prelude::*;
use rtpcast::engine::catalog::{self, RESOLUTIONS};
use rtpcast::engine::{
    ConfigError, Platform, StreamConfig, StreamOptions, StreamTarget, compile, parse_address,
};

fn host_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9-]{0,15}",
        (1u8..=254, 0u8..=255, 0u8..=255, 1u8..=254)
            .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn valid_addresses_parse(host in host_strategy(), port in 1u16..=65535) {
        let (h, p) = parse_address(&format!("{}:{}", host, port)).unwrap();
        prop_assert_eq!(h, host);
        prop_assert_eq!(p, port);
    }

    #[test]
    fn out_of_range_ports_are_rejected(host in host_strategy(), port in 65536u32..1_000_000) {
        let err = parse_address(&format!("{}:{}", host, port)).unwrap_err();
        let is_invalid_address = matches!(err, ConfigError::InvalidAddress { .. });
        prop_assert!(is_invalid_address, "expected InvalidAddress, got {:?}", err);
    }

    #[test]
    fn extra_colons_are_rejected(host in host_strategy(), a in 1u16..=65535, b in 1u16..=65535) {
        let addr = format!("{}:{}:{}", host, a, b);
        prop_assert!(parse_address(&addr).is_err());
    }

    #[test]
    fn audio_port_defaults_to_next_port(port in 1u16..65535) {
        let target = StreamTarget::resolve(
            "x264enc",
            "HD",
            &format!("stream.local:{}", port),
            StreamOptions::default(),
        )
        .unwrap();
        prop_assert_eq!(target.audio_port(), port + 1);
    }

    #[test]
    fn compile_is_deterministic_and_well_formed(
        encoder_idx in 0usize..64,
        resolution_idx in 0usize..64,
        port in 1u16..60000,
        macos in any::<bool>(),
    ) {
        let encoders: Vec<_> = catalog::encoders().collect();
        let encoder = encoders[encoder_idx % encoders.len()];
        let resolution = RESOLUTIONS[resolution_idx % RESOLUTIONS.len()].resolution;
        let platform = if macos { Platform::MacOs } else { Platform::Linux };

        let target = match StreamTarget::resolve(
            encoder.id(),
            resolution.name,
            &format!("10.1.2.3:{}", port),
            StreamOptions::default(),
        ) {
            Ok(target) => target,
            Err(ConfigError::IncompatibleConfiguration { .. }) => return Ok(()),
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        };
        let config = StreamConfig::with_test_sources(target);

        let first = compile(&config, platform).unwrap();
        let second = compile(&config, platform).unwrap();
        prop_assert_eq!(&first, &second);

        let port_token = format!("port={}", port);
        let audio_port_token = format!("port={}", port + 1);
        let video_line = first.video.launch_line();
        let audio_line = first.audio.launch_line();
        let video_tail = format!("{} sync=false async=false", port_token);
        let audio_tail = format!("{} sync=false async=false", audio_port_token);
        prop_assert!(video_line.ends_with(&video_tail), "video line: {}", video_line);
        prop_assert!(audio_line.ends_with(&audio_tail), "audio line: {}", audio_line);
    }
}
