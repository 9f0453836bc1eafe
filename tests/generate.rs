// End-to-end checks of the public pipeline: builder in, writer bytes out.

use image::{Rgba, RgbaImage};
use qrcomposer::mask::{apply_mask, score_candidates};
use qrcomposer::{
    Builder, Charset, EcLevel, LabelAlignment, QrError, QrSymbol, RoundBlockSizeMode, SymbolRequest, Version,
    WriterKind,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn data_builder() -> Builder {
    Builder::new()
        .data("Data")
        .encoding("UTF-8")
        .error_correction_level(EcLevel::Low)
        .size(300)
        .margin(10)
        .round_block_size_mode(RoundBlockSizeMode::Margin)
}

#[test]
fn png_and_binary_outputs() {
    init_tracing();
    let png = data_builder().writer(WriterKind::Png).build().unwrap();
    assert_eq!(png.mime_type(), "image/png");
    let img = image::load_from_memory(png.bytes()).unwrap();
    assert_eq!((img.width(), img.height()), (320, 320));

    let binary = data_builder().writer(WriterKind::Binary).build().unwrap();
    assert_eq!(binary.mime_type(), "text/plain");
    let text = binary.as_text().unwrap();
    assert_eq!(text.lines().count(), 21);
    assert!(text.lines().all(|l| l.len() == 21 && l.bytes().all(|b| b == b'0' || b == b'1')));
}

#[test]
fn validated_png_round_trips() {
    init_tracing();
    let result = data_builder().validate_result(true).build().unwrap();
    assert_eq!(result.mime_type(), "image/png");

    let latin = Builder::new()
        .data("Grüße aus Köln")
        .charset(Charset::Iso8859_1)
        .error_correction_level(EcLevel::Medium)
        .validate_result(true)
        .build();
    assert!(latin.is_ok(), "{latin:?}");
}

#[test]
fn logo_and_label_still_scan() {
    init_tracing();
    let mut logo = RgbaImage::from_pixel(100, 60, Rgba([200, 30, 30, 255]));
    for (x, _, px) in logo.enumerate_pixels_mut() {
        if x % 10 == 0 {
            *px = Rgba([0, 0, 0, 0]);
        }
    }
    let result = Builder::new()
        .data("https://example.com/with/a/logo")
        .error_correction_level(EcLevel::High)
        .size(330)
        .logo(logo)
        .logo_resize_to_width(60)
        .logo_punchout_background(true)
        .label_text("example.com")
        .label_alignment(LabelAlignment::Center)
        .validate_result(true)
        .build()
        .unwrap();
    let img = image::load_from_memory(result.bytes()).unwrap();
    assert_eq!(img.width(), 350);
    assert!(img.height() > 350);
}

#[test]
fn oversized_payload_is_rejected() {
    let err = Builder::new()
        .data_bytes(vec![b'x'; 3000])
        .charset(Charset::Iso8859_1)
        .error_correction_level(EcLevel::High)
        .build()
        .unwrap_err();
    match err {
        QrError::CapacityExceeded { capacity_bits, version, .. } => {
            assert_eq!(version, 40);
            assert_eq!(capacity_bits, 1276 * 8);
        }
        other => panic!("unexpected error {other:?}"),
    }

    let err = Builder::new().data("too long for v1").version(1).error_correction_level(EcLevel::High).build();
    assert!(matches!(err, Err(QrError::CapacityExceeded { version: 1, .. })));
}

#[test]
fn too_small_size_is_rejected() {
    let err = data_builder().size(10).build().unwrap_err();
    assert!(matches!(err, QrError::InvalidDimension(_)));
}

#[test]
fn stored_mask_is_the_lowest_penalty() {
    for (text, ecl) in [("Data", EcLevel::Low), ("0123456789012345", EcLevel::Quartile), ("mask check, a bit longer payload", EcLevel::High)] {
        let qr = QrSymbol::encode_text(text, ecl).unwrap();
        assert_eq!(qr.matrix().read_mask(), qr.mask());
        assert_eq!(qr.matrix().read_error_correction_level(), ecl);

        let mut unmasked = qr.matrix().clone();
        apply_mask(&mut unmasked, qr.mask());
        let scores = score_candidates(&unmasked);
        let min = scores.iter().map(|(_, s)| s.total()).min().unwrap();
        let best = scores.iter().find(|(_, s)| s.total() == min).unwrap().0;
        assert_eq!(best, qr.mask(), "{text}");
    }
}

#[test]
fn function_modules_do_not_depend_on_data() {
    let a = QrSymbol::encode(&SymbolRequest::new("first payload").with_version(Version::new(7).unwrap())).unwrap();
    let b = QrSymbol::encode(&SymbolRequest::new("SECOND").with_version(Version::new(7).unwrap())).unwrap();
    assert_eq!(a.size(), 45);
    for y in 0..a.size() {
        for x in 0..a.size() {
            assert_eq!(a.matrix().is_function(x, y), b.matrix().is_function(x, y));
            // Format areas differ with the mask; everything else must match
            let in_format = (x == 8 && (y < 9 || y >= a.size() - 8)) || (y == 8 && (x < 9 || x >= a.size() - 8));
            if a.matrix().is_function(x, y) && !in_format {
                assert_eq!(a.matrix().get(x, y), b.matrix().get(x, y), "({x},{y})");
            }
        }
    }
}

#[test]
fn versions_grow_with_payload() {
    let mut last = 1;
    for len in [1usize, 20, 60, 150, 400, 900] {
        let qr = QrSymbol::encode(&SymbolRequest::from_bytes(vec![b'a'; len], Charset::Iso8859_1)).unwrap();
        assert!(qr.version().value() >= last);
        last = qr.version().value();
    }
    assert!(last > 10);
}

#[test]
fn svg_and_console_writers() {
    let svg = data_builder().writer(WriterKind::Svg).build().unwrap();
    assert_eq!(svg.mime_type(), "image/svg+xml");
    assert!(svg.as_text().unwrap().starts_with("<?xml"));

    let console = data_builder().writer(WriterKind::Console).build().unwrap();
    assert_eq!(console.mime_type(), "text/plain");
    assert_eq!(console.as_text().unwrap().lines().count(), 13);
}

#[test]
fn save_creates_directories() {
    let dir = std::env::temp_dir().join(format!("qrcomposer-test-{}", std::process::id()));
    let path = dir.join("nested").join("data.png");
    let result = data_builder().build().unwrap();
    result.save_to(&path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), result.bytes());
    std::fs::remove_dir_all(&dir).unwrap();
}
