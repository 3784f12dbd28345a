//! Interprets RPC and on-chain errors into readable listing program/Solana instruction error
//! messages.

use std::fmt::Display;

use listing_interface::{
    error::ListingProgramError,
    instructions::ListingInstruction,
};
use solana_client::{
    client_error::{
        ClientError,
        ClientErrorKind,
    },
    rpc_request::{
        RpcError::RpcResponseError,
        RpcResponseErrorData,
    },
    rpc_response::RpcSimulateTransactionResult,
};
use solana_instruction_error::InstructionError as SolanaInstructionError;
use solana_sdk::message::Message;
use solana_transaction_error::TransactionError;

use crate::{
    fmt_kv,
    LogColor,
};

#[derive(Clone, Debug, PartialEq, Eq)]
enum InstructionError {
    Solana {
        instruction_index: u8,
        error: SolanaInstructionError,
    },
    Listing {
        instruction: ListingInstruction,
        error: ListingProgramError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrettyInstructionError(InstructionError);

impl PrettyInstructionError {
    /// Extracts the failing instruction from a preflight failure.
    pub fn new(error: &ClientError, message: &Message) -> Option<Self> {
        match error.kind() {
            ClientErrorKind::RpcError(RpcResponseError {
                data:
                    RpcResponseErrorData::SendTransactionPreflightFailure(
                        RpcSimulateTransactionResult {
                            err: Some(ui_err), ..
                        },
                    ),
                ..
            }) => Self::from_transaction_error(&ui_err.clone().into(), message),
            _ => None,
        }
    }

    /// Custom error codes are only read as [`ListingProgramError`]s when the failing instruction
    /// carries a listing instruction discriminator.
    pub fn from_transaction_error(error: &TransactionError, message: &Message) -> Option<Self> {
        let TransactionError::InstructionError(instruction_index, instruction_error) = error else {
            return None;
        };
        let compiled = message.instructions.get(*instruction_index as usize)?;
        let listing_instruction = ListingInstruction::from_instruction_data(&compiled.data);

        let res = match (instruction_error, listing_instruction) {
            (SolanaInstructionError::Custom(code), Some(instruction)) => {
                match ListingProgramError::from_code(*code) {
                    Some(error) => Self(InstructionError::Listing { instruction, error }),
                    None => Self(InstructionError::Solana {
                        instruction_index: *instruction_index,
                        error: SolanaInstructionError::Custom(*code),
                    }),
                }
            }
            (instruction_error, _) => Self(InstructionError::Solana {
                instruction_index: *instruction_index,
                error: instruction_error.clone(),
            }),
        };

        Some(res)
    }

    pub fn program_error(&self) -> Option<ListingProgramError> {
        match &self.0 {
            InstructionError::Listing { error, .. } => Some(*error),
            InstructionError::Solana { .. } => None,
        }
    }
}

impl Display for PrettyInstructionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (error_type, instruction, error) = match &self.0 {
            InstructionError::Solana {
                instruction_index,
                error,
            } => (
                "SolanaInstructionError",
                format!("instruction #{instruction_index}"),
                error.to_string(),
            ),
            InstructionError::Listing { instruction, error } => {
                ("ListingProgramError", instruction.to_string(), error.to_string())
            }
        };

        let message = format!("({instruction}, {error})");
        write!(f, "{}", fmt_kv!(error_type, message, LogColor::Error))
    }
}

#[cfg(test)]
mod tests {
    use listing_interface::instructions::{
        pack,
        SwapInstructionData,
    };
    use solana_sdk::{
        instruction::{
            AccountMeta,
            Instruction,
        },
        pubkey::Pubkey,
    };

    use super::*;

    fn message_with(data: Vec<u8>) -> Message {
        let payer = Pubkey::new_unique();
        let ixn = Instruction {
            program_id: listing_interface::program::ID,
            accounts: vec![AccountMeta::new(payer, true)],
            data,
        };
        Message::new(&[ixn], Some(&payer))
    }

    #[test]
    fn decodes_listing_program_errors() {
        let data = pack(ListingInstruction::Sell, &SwapInstructionData { amount: 1 }).unwrap();
        let message = message_with(data);
        let error =
            TransactionError::InstructionError(0, SolanaInstructionError::Custom(6001));
        let pretty = PrettyInstructionError::from_transaction_error(&error, &message).unwrap();
        assert_eq!(
            pretty.program_error(),
            Some(ListingProgramError::InsufficientTokens)
        );
        assert!(pretty
            .to_string()
            .contains("(sell, InsufficientTokens (6001): Invalid Tokens)"));
    }

    #[test]
    fn foreign_instructions_stay_generic() {
        let message = message_with(vec![1, 2, 3]);
        let error = TransactionError::InstructionError(0, SolanaInstructionError::Custom(6001));
        let pretty = PrettyInstructionError::from_transaction_error(&error, &message).unwrap();
        assert_eq!(pretty.program_error(), None);

        let out_of_range =
            TransactionError::InstructionError(4, SolanaInstructionError::Custom(6001));
        assert!(PrettyInstructionError::from_transaction_error(&out_of_range, &message).is_none());
        assert!(
            PrettyInstructionError::from_transaction_error(&TransactionError::AccountInUse, &message)
                .is_none()
        );
    }
}
