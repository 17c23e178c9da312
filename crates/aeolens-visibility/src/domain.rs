//! Citation URL normalization.

/// Reduce a cited URL to its registrable root domain.
///
/// Strips scheme, path, and port, then keeps the last two labels — or the
/// last three when the TLD looks like a country code with a short second
/// level (`bbc.co.uk`, `example.com.au`). Returns `None` for strings with
/// no host.
#[must_use]
pub fn root_domain(url: &str) -> Option<String> {
    let host = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()?
        .split(':')
        .next()?
        .to_lowercase();

    if host.is_empty() {
        return None;
    }

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 2 {
        let last = parts[parts.len() - 1];
        let second_last = parts[parts.len() - 2];
        if last.len() == 2 && second_last.len() <= 3 {
            return Some(parts[parts.len() - 3..].join("."));
        }
        return Some(parts[parts.len() - 2..].join("."));
    }

    Some(host)
}
