use sandwich_model::SandwichStr;

/// Discord sends `joined_at` as an RFC3339 timestamp, but a handful of
/// malformed payloads have been observed in the wild with truncated or
/// garbage values. Rather than failing the whole member upsert, the cache
/// stores an empty string when the value doesn't look like a timestamp.
///
/// This is a cheap structural check, not a full parse: it only rejects
/// values that are obviously not RFC3339 (wrong length, missing the `T`
/// separator). It is not a validator for calendar correctness.
pub fn joined_at_or_empty(raw: &str) -> SandwichStr<'static> {
    if looks_like_rfc3339(raw) {
        SandwichStr::Owned(raw.to_owned())
    } else {
        SandwichStr::Borrowed("")
    }
}

fn looks_like_rfc3339(raw: &str) -> bool {
    // "2021-01-01T00:00:00.000000+00:00" (minimum: "2021-01-01T00:00:00Z")
    if raw.len() < 20 {
        return false;
    }
    let bytes = raw.as_bytes();
    bytes.get(4) == Some(&b'-')
        && bytes.get(7) == Some(&b'-')
        && (bytes.get(10) == Some(&b'T') || bytes.get(10) == Some(&b't'))
        && bytes.get(13) == Some(&b':')
        && bytes.get(16) == Some(&b':')
        && raw[..4].bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_timestamp() {
        let out = joined_at_or_empty("2021-01-01T00:00:00.000000+00:00");
        assert_eq!(&*out, "2021-01-01T00:00:00.000000+00:00");
    }

    #[test]
    fn rejects_garbage() {
        let out = joined_at_or_empty("not-a-timestamp");
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_empty_string() {
        let out = joined_at_or_empty("");
        assert!(out.is_empty());
    }
}
