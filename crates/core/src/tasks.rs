//! Task color management
//!
//! Tasks get a stable color derived from their name so the same task reads
//! the same way across plans, reports and watch runs.

use std::collections::HashMap;

use colored::Color;

/// Label colors that stay readable on dark and light terminals
const PALETTE: [(u8, u8, u8); 8] = [
    (86, 182, 194),
    (229, 192, 123),
    (198, 120, 221),
    (152, 195, 121),
    (97, 175, 239),
    (224, 108, 117),
    (209, 154, 102),
    (171, 178, 191),
];

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Get a consistent color for a task name
pub fn get_task_color(task_name: &str) -> Color {
    let hash = task_name
        .bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME));
    let slot = usize::try_from(hash % PALETTE.len() as u64).unwrap_or_default();
    let (r, g, b) = PALETTE[slot];
    Color::TrueColor { r, g, b }
}

/// Color mapping for a set of task names
pub fn get_task_colors<'a>(names: impl IntoIterator<Item = &'a str>) -> HashMap<String, Color> {
    names
        .into_iter()
        .map(|name| (name.to_string(), get_task_color(name)))
        .collect()
}
