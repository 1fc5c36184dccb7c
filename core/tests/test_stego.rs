#[cfg(test)]
mod tests {
    use image::Rgb;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    use framecode_core::code::{CodeEncoder, CodeScanner, GridCode};
    use framecode_core::stego::{embed, extract, CarrierScanner};
    use framecode_core::types::StegoError;
    use framecode_core::video::Frame;

    fn noisy_frame(width: u32, height: u32, seed: u64) -> Frame {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut raw = vec![0u8; (width * height * 3) as usize];
        rng.fill_bytes(&mut raw);
        Frame::from_raw(width, height, raw).unwrap()
    }

    #[test]
    fn embedded_code_is_recovered_from_a_noisy_carrier() {
        let code = GridCode::new(32, 2, 2).unwrap();
        let rendered = code.render(b"hidden in plain sight").unwrap();

        let mut carrier = noisy_frame(160, 120, 1);
        embed(&mut carrier, &rendered).unwrap();

        // the naked scanner sees noise, the carrier scanner sees the code
        assert!(code.scan(&carrier).is_none());
        let scanner = CarrierScanner::new(code);
        assert_eq!(scanner.scan(&carrier).unwrap(), b"hidden in plain sight");
    }

    #[test]
    fn embedding_only_touches_low_bits_of_the_centre() {
        let code = GridCode::new(16, 1, 0).unwrap();
        let rendered = code.render(b"x").unwrap();

        let original = noisy_frame(40, 40, 2);
        let mut carrier = original.clone();
        embed(&mut carrier, &rendered).unwrap();

        let side = code.side_px();
        let o = (40 - side) / 2;
        for (x, y, px) in carrier.enumerate_pixels() {
            let before = original.get_pixel(x, y);
            let inside = (o..o + side).contains(&x) && (o..o + side).contains(&y);
            for c in 0..3 {
                assert_eq!(px[c] & 0xF0, before[c] & 0xF0);
                if !inside {
                    assert_eq!(px[c], before[c]);
                }
            }
        }
    }

    #[test]
    fn bare_code_survives_extraction() {
        let code = GridCode::new(32, 2, 2).unwrap();
        let rendered = code.render(b"no carrier").unwrap();

        let extracted = extract(&rendered);
        assert_eq!(code.scan(&extracted).unwrap(), b"no carrier");
        assert_eq!(CarrierScanner::new(code).scan(&rendered).unwrap(), b"no carrier");
    }

    #[test]
    fn carrier_smaller_than_code_is_rejected() {
        let code = GridCode::new(32, 2, 2).unwrap();
        let rendered = code.render(b"big").unwrap();
        let mut carrier = Frame::from_pixel(20, 20, Rgb([0, 0, 0]));

        let err = embed(&mut carrier, &rendered).unwrap_err();
        assert!(matches!(err, StegoError::CarrierTooSmall { carrier_width: 20, .. }));
        assert_eq!(err.exit_code(), 6);
    }
}
