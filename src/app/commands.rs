//! Inbound control commands.
//!
//! The control characteristic accepts short ASCII tokens from the central.
//! Tokens are matched after stripping trailing NULs and ASCII whitespace —
//! some clients append a terminator, some do not, and the match must not
//! depend on which. Unrecognised bytes are ignored silently: no mode
//! change, nothing reported upstream.

/// Commands accepted on the control characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Promote to Active and start the bulk transport.
    BoostOn,
    /// Stop the bulk transport and drop back to Probe.
    BoostOff,
}

impl ControlCommand {
    /// Parse a raw control-characteristic write. Returns `None` for
    /// anything that is not an exact trimmed token match.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let end = raw
            .iter()
            .rposition(|b| *b != 0 && !b.is_ascii_whitespace())
            .map(|i| i + 1)?;
        match &raw[..end] {
            b"BOOST_ON" => Some(Self::BoostOn),
            b"BOOST_OFF" => Some(Self::BoostOff),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_tokens() {
        assert_eq!(ControlCommand::parse(b"BOOST_ON"), Some(ControlCommand::BoostOn));
        assert_eq!(ControlCommand::parse(b"BOOST_OFF"), Some(ControlCommand::BoostOff));
    }

    #[test]
    fn parses_nul_terminated_tokens() {
        // Clients that send C strings include the terminator.
        assert_eq!(ControlCommand::parse(b"BOOST_ON\0"), Some(ControlCommand::BoostOn));
        assert_eq!(ControlCommand::parse(b"BOOST_OFF\0"), Some(ControlCommand::BoostOff));
    }

    #[test]
    fn parses_trailing_whitespace() {
        assert_eq!(ControlCommand::parse(b"BOOST_ON\r\n"), Some(ControlCommand::BoostOn));
        assert_eq!(ControlCommand::parse(b"BOOST_OFF \0"), Some(ControlCommand::BoostOff));
    }

    #[test]
    fn rejects_garbage_and_prefixes() {
        assert_eq!(ControlCommand::parse(b""), None);
        assert_eq!(ControlCommand::parse(b"\0\0"), None);
        assert_eq!(ControlCommand::parse(b"BOOST"), None);
        assert_eq!(ControlCommand::parse(b"BOOST_ONX"), None);
        assert_eq!(ControlCommand::parse(b"boost_on"), None);
        assert_eq!(ControlCommand::parse(b" BOOST_ON"), None, "leading space is not trimmed");
        assert_eq!(ControlCommand::parse(&[0xFF, 0x00]), None);
    }

    #[test]
    fn rejects_embedded_nul() {
        assert_eq!(ControlCommand::parse(b"BOOST\0_ON"), None);
    }
}
