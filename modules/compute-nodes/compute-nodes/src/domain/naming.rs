//! Automatic rename targets.

/// Splits `web-12` into `("web", Some(12))`; anything else has no counter.
fn split_counter(name: &str) -> (&str, Option<u64>) {
    match name.rsplit_once('-') {
        Some((base, digits))
            if !base.is_empty()
                && !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            match digits.parse() {
                Ok(n) => (base, Some(n)),
                Err(_) => (name, None),
            }
        }
        _ => (name, None),
    }
}

/// Derives the next free name after `current`.
///
/// A trailing `-N` counter is incremented, otherwise `-1` is appended. The
/// counter keeps increasing until `is_taken` accepts the candidate.
#[must_use]
pub fn next_available_name(current: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let (base, counter) = split_counter(current);
    let mut n = counter.map_or(1, |c| c.saturating_add(1));
    loop {
        let candidate = format!("{base}-{n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n = n.saturating_add(1);
    }
}
