//! Anchor-style 8-byte discriminators.
//!
//! Instructions are tagged with `sha256("global:<snake_case_name>")[..8]` and accounts with
//! `sha256("account:<TypeName>")[..8]`.

use sha2::{
    Digest,
    Sha256,
};

pub const DISCRIMINATOR_LEN: usize = 8;

pub type Discriminator = [u8; DISCRIMINATOR_LEN];

pub fn instruction_discriminator(name: &str) -> Discriminator {
    namespaced("global", name)
}

pub fn account_discriminator(name: &str) -> Discriminator {
    namespaced("account", name)
}

fn namespaced(namespace: &str, name: &str) -> Discriminator {
    let digest = Sha256::new()
        .chain_update(namespace.as_bytes())
        .chain_update(b":")
        .chain_update(name.as_bytes())
        .finalize();

    let mut discriminator = [0u8; DISCRIMINATOR_LEN];
    discriminator.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    discriminator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_instruction_discriminators() {
        // Any Anchor program's `buy` and `sell` share these tags.
        assert_eq!(
            instruction_discriminator("buy"),
            [102, 6, 61, 18, 1, 218, 235, 234]
        );
        assert_eq!(
            instruction_discriminator("sell"),
            [51, 230, 133, 164, 1, 127, 131, 173]
        );
    }

    #[test]
    fn namespaces_are_separated() {
        assert_ne!(
            instruction_discriminator("Listing"),
            account_discriminator("Listing")
        );
    }
}
