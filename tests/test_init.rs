use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use ramp_init::{cpu, init_pixel, render, Backend, GlobalId, Image, RGBAF, TILE_SIZE};

const SIZES: [(u32, u32); 7] = [(1, 1), (4, 1), (7, 7), (8, 8), (9, 17), (64, 3), (320, 180)];

/// Runs the init kernel and counts how often each in-bounds pixel is written.
/// Returns the counts, and whether any out-of-bounds work-item produced a value.
fn count_writes(width: u32, height: u32) -> (Vec<u32>, bool) {
    let counts: Vec<AtomicU32> = (0..width as usize * height as usize)
        .map(|_| AtomicU32::new(0))
        .collect();
    let overrun = AtomicBool::new(false);
    let mut image = Image::new(RGBAF::TRANSPARENT, width, height);

    cpu::dispatch(&mut image, |id| {
        let pixel = init_pixel(id, width, height);
        if pixel.is_some() {
            if id.in_bounds(width, height) {
                counts[id.y as usize * width as usize + id.x as usize]
                    .fetch_add(1, Ordering::Relaxed);
            } else {
                overrun.store(true, Ordering::Relaxed);
            }
        }
        pixel
    });

    let counts = counts.into_iter().map(AtomicU32::into_inner).collect();
    (counts, overrun.into_inner())
}

#[test]
fn every_pixel_written_once() {
    for (width, height) in SIZES {
        let (counts, _) = count_writes(width, height);
        assert_eq!(counts.len(), width as usize * height as usize);
        assert!(
            counts.iter().all(|c| *c == 1),
            "{}x{} has pixels not written exactly once",
            width,
            height
        );
    }
}

#[test]
fn edge_work_items_never_write() {
    for (width, height) in SIZES {
        let (_, overrun) = count_writes(width, height);
        assert!(!overrun, "{}x{} wrote out of bounds", width, height);
    }
}

#[test]
fn value_law() {
    for (width, height) in SIZES {
        let image = render(Backend::Cpu, width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                let pixel = image.pixel(x, y).unwrap();
                let expected = x as f32 / width as f32;
                assert!((pixel.r - expected).abs() <= f32::EPSILON, "({}, {})", x, y);
                assert_eq!((pixel.g, pixel.b, pixel.a), (0.0, 0.0, 1.0));
                assert!(pixel.r >= 0.0 && pixel.r < 1.0);
            }
        }
    }
}

#[test]
fn idempotent() {
    let mut image = Image::new(RGBAF::TRANSPARENT, 37, 11);
    cpu::init(&mut image);
    let first = image.clone();
    cpu::init(&mut image);
    assert_eq!(first, image);
}

#[test]
fn overwrites_previous_contents() {
    let stale = RGBAF::new(0.9, 0.9, 0.9, 0.0);
    let mut image = Image::new(stale, 12, 5);
    cpu::init(&mut image);
    assert_eq!(image, render(Backend::Cpu, 12, 5).unwrap());
}

#[test]
fn degenerate_dimensions() {
    for (width, height) in [(0, 0), (0, 9), (9, 0)] {
        let launched = AtomicU32::new(0);
        let mut image = Image::new(RGBAF::TRANSPARENT, width, height);
        cpu::dispatch(&mut image, |id| {
            launched.fetch_add(1, Ordering::Relaxed);
            init_pixel(id, width, height)
        });
        assert_eq!(launched.into_inner(), 0);
        assert!(image.is_empty());
        assert_eq!(init_pixel(GlobalId::new(0, 0), width, height), None);
    }
}

#[test]
fn four_by_one() {
    let image = render(Backend::Cpu, 4, 1).unwrap();
    let expected: Vec<RGBAF> = [0.0, 0.25, 0.5, 0.75]
        .iter()
        .map(|r| RGBAF::new(*r, 0.0, 0.0, 1.0))
        .collect();
    assert_eq!(image.contents(), expected.as_slice());
}

#[test]
fn random_dimensions() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    for _ in 0..32 {
        let width = rng.gen_range(1..=3 * TILE_SIZE * 4);
        let height = rng.gen_range(1..=3 * TILE_SIZE);
        let (counts, overrun) = count_writes(width, height);
        assert!(!overrun);
        assert!(counts.iter().all(|c| *c == 1), "{}x{}", width, height);

        let image = render(Backend::Cpu, width, height).unwrap();
        let last = image.pixel(width - 1, height - 1).unwrap();
        assert_eq!(last.r, (width - 1) as f32 / width as f32);
    }
}
