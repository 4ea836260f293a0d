use bitflags::bitflags;

bitflags! {
    /// Filter capabilities exchanged during the handshake
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const CLEAN = 1;
        const SMUDGE = 1 << 1;
        const DELAY = 1 << 2;
    }
}

impl Capabilities {
    /// What this filter answers with, regardless of what git offers on top
    pub const SUPPORTED: Capabilities = Capabilities::CLEAN.union(Capabilities::SMUDGE);

    /// Map a capability name to its flag. Unknown names map to `None` and are
    /// ignored by the handshake.
    pub fn from_capability(name: &str) -> Option<Capabilities> {
        match name {
            "clean" => Some(Capabilities::CLEAN),
            "smudge" => Some(Capabilities::SMUDGE),
            "delay" => Some(Capabilities::DELAY),
            _ => None,
        }
    }

    /// Capability names in handshake order
    pub fn names(&self) -> Vec<&'static str> {
        [
            (Capabilities::CLEAN, "clean"),
            (Capabilities::SMUDGE, "smudge"),
            (Capabilities::DELAY, "delay"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }
}
