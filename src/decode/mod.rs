//! Decoders for the individual router pages.
//!
//! Decoders never fail. Whatever can't be found or parsed comes out as
//! `None`, and the record types in [`crate::model`] decide whether that's
//! acceptable.

pub mod devices;
pub mod modem;
pub mod sms;

/// Leading integer of a cell, so both `-85` and `-85 dBm` read as `-85`.
pub(crate) fn as_int(text: Option<&str>) -> Option<i32> {
    text?.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::as_int;

    #[test]
    fn leading_int() {
        assert_eq!(as_int(Some("-85 dBm")), Some(-85));
        assert_eq!(as_int(Some(" 12 ")), Some(12));
        assert_eq!(as_int(Some("n/a")), None);
        assert_eq!(as_int(Some("")), None);
        assert_eq!(as_int(None), None);
    }
}
