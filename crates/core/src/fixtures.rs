//! Deterministic synthetic frames for tests. Templates are seeded noise
//! patches, frames are seeded noise with patches pasted at fixed spots.

use image::{imageops, Rgba, RgbaImage};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub const FRAME_W: u32 = 160;
pub const FRAME_H: u32 = 120;
pub const TEMPLATE_SIDE: u32 = 16;

/// Screenshot name -> the one indicator it shows.
pub const SCENARIOS: [(&str, &str); 5] = [
    ("av_dead", "resurrection"),
    ("av_end", "leave_battleground"),
    ("av_enter_battle", "enter_battle"),
    ("av_instance_menu", "join_battle"),
    ("av_queuing_menu", "queue_for_battleground"),
];

fn noise(w: u32, h: u32, seed: u64) -> RgbaImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbaImage::from_fn(w, h, |_, _| Rgba([rng.gen(), rng.gen(), rng.gen(), 255]))
}

/// Noise image of any size, for frames larger than the default.
pub fn noise_frame(w: u32, h: u32, seed: u64) -> RgbaImage {
    noise(w, h, 90_000 + seed)
}

pub fn noise_template(seed: u64) -> RgbaImage {
    noise(TEMPLATE_SIDE, TEMPLATE_SIDE, 1_000 + seed)
}

pub fn frame_with(patches: &[(&RgbaImage, u32, u32)], seed: u64) -> RgbaImage {
    let mut frame = noise(FRAME_W, FRAME_H, 50_000 + seed);
    for (patch, x, y) in patches {
        imageops::replace(&mut frame, *patch, *x as i64, *y as i64);
    }
    frame
}

/// Template for one of the indicator names used by the battleground loop.
pub fn indicator(name: &str) -> RgbaImage {
    let seed = name.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    noise_template(seed % 10_000)
}

/// Frame showing exactly the given indicators, each at its own slot.
pub fn frame_showing(names: &[&str]) -> RgbaImage {
    let templates: Vec<RgbaImage> = names.iter().map(|n| indicator(n)).collect();
    let patches: Vec<(&RgbaImage, u32, u32)> = templates
        .iter()
        .enumerate()
        .map(|(i, t)| (t, 8 + (i as u32 % 4) * 36, 12 + (i as u32 / 4) * 40))
        .collect();
    frame_with(&patches, names.len() as u64)
}

pub fn scenario_frame(scenario: &str) -> RgbaImage {
    let indicator_name = SCENARIOS
        .iter()
        .find(|(s, _)| *s == scenario)
        .map(|(_, n)| *n)
        .unwrap_or("resurrection");
    frame_showing(&[indicator_name])
}
