/// Anchor offsets every user-defined error code by this amount; the first variant below starts here.
pub const CUSTOM_ERROR_OFFSET: u32 = 6000;

/// The custom errors the listing program can fail with.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::FromRepr, strum_macros::EnumIter)]
#[repr(u32)]
pub enum ListingProgramError {
    InvalidAmount = CUSTOM_ERROR_OFFSET,
    InsufficientTokens,
    CalculationError,
    AlreadyMinted,
    Overflow,
    MathOverflow,
    InvalidCalculation,
}

impl ListingProgramError {
    /// Maps a `Custom(code)` instruction error back to the program's error, if it is one.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_repr(code)
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

impl From<ListingProgramError> for &'static str {
    fn from(value: ListingProgramError) -> Self {
        match value {
            ListingProgramError::InvalidAmount => "Invalid Amount - it should be greater than 0",
            ListingProgramError::InsufficientTokens => "Invalid Tokens",
            ListingProgramError::CalculationError => "Calculation Error",
            ListingProgramError::AlreadyMinted => "Already Minted",
            ListingProgramError::Overflow => "Overflow",
            ListingProgramError::MathOverflow => "Math Overflow",
            ListingProgramError::InvalidCalculation => "Invalid Calculation",
        }
    }
}

impl core::fmt::Display for ListingProgramError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let message: &'static str = (*self).into();
        write!(f, "{self:?} ({}): {message}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn error_codes_start_at_the_anchor_offset() {
        let codes: Vec<u32> = ListingProgramError::iter().map(|e| e.code()).collect();
        assert_eq!(codes, (6000..6007).collect::<Vec<_>>());
        for error in ListingProgramError::iter() {
            assert_eq!(ListingProgramError::from_code(error.code()), Some(error));
        }
        assert_eq!(ListingProgramError::from_code(1), None);
    }
}
