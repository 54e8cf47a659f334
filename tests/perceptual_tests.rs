use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imgdupe::scanner::{FingerprintConfig, Fingerprinter, Signature};
use std::path::Path;
use tempfile::tempdir;

/// Deterministic xorshift generator for synthetic test images.
struct Noise(u64);

impl Noise {
    fn next_u8(&mut self) -> u8 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 32) as u8
    }
}

/// 80x90 image of 10x10 blocks with random gray levels.
fn block_noise(seed: u64) -> GrayImage {
    let mut noise = Noise(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1);
    let levels: Vec<u8> = (0..72).map(|_| noise.next_u8()).collect();
    GrayImage::from_fn(80, 90, |x, y| Luma([levels[(y / 10 * 8 + x / 10) as usize]]))
}

/// 256x192 image whose row bands alternate between rising and falling ramps.
fn banded_ramps() -> GrayImage {
    GrayImage::from_fn(256, 192, |x, y| {
        let ramp = x as u8;
        let band = y * 9 / 192;
        Luma([if band % 2 == 0 { ramp } else { 255 - ramp }])
    })
}

/// 128x128 checkerboard of 32px squares.
fn checkerboard() -> GrayImage {
    GrayImage::from_fn(128, 128, |x, y| {
        Luma([if (x / 32 + y / 32) % 2 == 0 { 40 } else { 215 }])
    })
}

fn fingerprint(img: &GrayImage) -> Signature {
    Fingerprinter::default()
        .fingerprint_image(&DynamicImage::ImageLuma8(img.clone()))
        .unwrap()
        .signature
}

fn save_jpeg(img: &GrayImage, path: &Path, quality: u8) {
    let file = std::fs::File::create(path).unwrap();
    DynamicImage::ImageLuma8(img.clone())
        .write_with_encoder(JpegEncoder::new_with_quality(file, quality))
        .unwrap();
}

#[test]
fn test_fingerprint_is_deterministic_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("noise.png");
    block_noise(1).save(&path).unwrap();

    let fingerprinter = Fingerprinter::default();
    let first = fingerprinter.fingerprint_path(&path).unwrap();
    let second = fingerprinter.fingerprint_path(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.source_dimensions, (90, 80));
}

#[test]
fn test_resized_recompressed_copy_is_similar() {
    let dir = tempdir().unwrap();
    let original_path = dir.path().join("original.png");
    let copy_path = dir.path().join("copy.jpg");

    let original = banded_ramps();
    original.save(&original_path).unwrap();
    let smaller = imageops::resize(&original, 128, 96, FilterType::Triangle);
    save_jpeg(&smaller, &copy_path, 70);

    let fingerprinter = Fingerprinter::default();
    let a = fingerprinter.fingerprint_path(&original_path).unwrap();
    let b = fingerprinter.fingerprint_path(&copy_path).unwrap();

    assert_eq!(b.source_dimensions, (96, 128));
    let score = a.signature.similarity(&b.signature).unwrap();
    assert!(score >= 0.9, "resized copy similarity {} below 0.9", score);
}

#[test]
fn test_brightness_and_contrast_shift_is_similar() {
    let original = banded_ramps();
    let mut shifted = original.clone();
    for pixel in shifted.pixels_mut() {
        pixel[0] = (f32::from(pixel[0]) * 0.7 + 40.0) as u8;
    }

    let score = fingerprint(&original)
        .similarity(&fingerprint(&shifted))
        .unwrap();
    assert!(score >= 0.9, "shifted copy similarity {} below 0.9", score);
}

#[test]
fn test_mirrored_image_is_not_similar() {
    let mut total = 0.0;
    let seeds = 1..=8u64;
    let count = seeds.clone().count() as f64;

    for seed in seeds {
        let img = block_noise(seed);
        let mirrored = imageops::flip_horizontal(&img);
        let score = fingerprint(&img).similarity(&fingerprint(&mirrored)).unwrap();
        assert!(score < 0.9, "seed {}: mirrored similarity {}", seed, score);
        total += score;
    }

    let mean = total / count;
    assert!(
        (0.3..=0.6).contains(&mean),
        "mean mirrored similarity {} not near 0.5",
        mean
    );
}

#[test]
fn test_unrelated_images_agree_by_chance() {
    let mut total = 0.0;
    let pairs = 10u64;

    for seed in 0..pairs {
        let a = fingerprint(&block_noise(100 + seed));
        let b = fingerprint(&block_noise(200 + seed));
        total += a.similarity(&b).unwrap();
    }

    let mean = total / pairs as f64;
    assert!(
        (0.35..=0.65).contains(&mean),
        "mean unrelated similarity {} not near 0.5",
        mean
    );
}

#[test]
fn test_mean_hash_resized_copy_is_similar() {
    let original = checkerboard();
    let smaller = imageops::resize(&original, 96, 96, FilterType::CatmullRom);

    let fingerprinter = Fingerprinter::new(FingerprintConfig::mean()).unwrap();
    let a = fingerprinter
        .fingerprint_image(&DynamicImage::ImageLuma8(original))
        .unwrap();
    let b = fingerprinter
        .fingerprint_image(&DynamicImage::ImageLuma8(smaller))
        .unwrap();

    assert_eq!(a.signature.len(), 64);
    assert!(a.signature.similarity(&b.signature).unwrap() >= 0.9);
}

#[test]
fn test_color_image_uses_luminance() {
    let gray = banded_ramps();
    let color = image::RgbImage::from_fn(256, 192, |x, y| {
        let v = gray.get_pixel(x, y)[0];
        image::Rgb([v, v, v])
    });

    let from_gray = fingerprint(&gray);
    let from_color = Fingerprinter::default()
        .fingerprint_image(&DynamicImage::ImageRgb8(color))
        .unwrap()
        .signature;
    assert_eq!(from_gray, from_color);
}

#[test]
fn test_corrupt_image_is_decode_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.png");
    std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really a png").unwrap();

    let result = Fingerprinter::default().fingerprint_path(&path);
    assert!(matches!(
        result,
        Err(imgdupe::scanner::FingerprintError::Decode(_))
    ));
}
