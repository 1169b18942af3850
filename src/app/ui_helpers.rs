pub fn wrap_prev_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if current == 0 {
        len - 1
    } else {
        current - 1
    }
}

pub fn wrap_next_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if current + 1 >= len {
        0
    } else {
        current + 1
    }
}

/// Whole-percent share of `part` in `total`, clamped to 100.
pub fn share_percent(part: u64, total: u64) -> u16 {
    if total == 0 {
        return 0;
    }
    ((part.min(total) as u128 * 100) / total as u128) as u16
}
