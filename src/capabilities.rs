/// Optional features the access layer can run with.
///
/// The defaults follow the `ipv6` and `tsig` cargo features. A disabled
/// capability never grants access: IPv6 entries stop matching and keyed
/// entries stop matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub ipv6: bool,
    pub tsig: bool,
}

impl Capabilities {
    /// Everything enabled, regardless of build features
    pub const ALL: Capabilities = Capabilities {
        ipv6: true,
        tsig: true,
    };

    pub fn without_ipv6(self) -> Self {
        Self { ipv6: false, ..self }
    }

    pub fn without_tsig(self) -> Self {
        Self { tsig: false, ..self }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            ipv6: cfg!(feature = "ipv6"),
            tsig: cfg!(feature = "tsig"),
        }
    }
}
