//! Registry of recognized on-chain programs.

pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const ASSOCIATED_TOKEN_PROGRAM: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
pub const METADATA_PROGRAM: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";
pub const STAKE_PROGRAM: &str = "Stake11111111111111111111111111111111111111";
pub const VOTE_PROGRAM: &str = "Vote111111111111111111111111111111111111111";
pub const MEMO_PROGRAM: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";
pub const COMPUTE_BUDGET_PROGRAM: &str = "ComputeBudget111111111111111111111111111111";
pub const JUPITER_PROGRAM: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";
pub const RAYDIUM_AMM_PROGRAM: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
pub const ORCA_WHIRLPOOL_PROGRAM: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";

/// Classification family of a recognized program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    System,
    Token,
    Metadata,
    Stake,
    Vote,
    Other,
}

/// A program the normalizer knows by id.
#[derive(Debug, Clone, Copy)]
pub struct KnownProgram {
    pub id: &'static str,
    pub name: &'static str,
    /// Label the provider uses in `jsonParsed` output, if any.
    pub label: Option<&'static str>,
    pub kind: ProgramKind,
}

static KNOWN_PROGRAMS: &[KnownProgram] = &[
    KnownProgram { id: SYSTEM_PROGRAM, name: "system", label: Some("system"), kind: ProgramKind::System },
    KnownProgram { id: TOKEN_PROGRAM, name: "spl_token", label: Some("spl-token"), kind: ProgramKind::Token },
    KnownProgram { id: TOKEN_2022_PROGRAM, name: "spl_token_2022", label: Some("spl-token-2022"), kind: ProgramKind::Token },
    KnownProgram { id: ASSOCIATED_TOKEN_PROGRAM, name: "associated_token_account", label: Some("spl-associated-token-account"), kind: ProgramKind::Other },
    KnownProgram { id: METADATA_PROGRAM, name: "token_metadata", label: None, kind: ProgramKind::Metadata },
    KnownProgram { id: STAKE_PROGRAM, name: "stake", label: Some("stake"), kind: ProgramKind::Stake },
    KnownProgram { id: VOTE_PROGRAM, name: "vote", label: Some("vote"), kind: ProgramKind::Vote },
    KnownProgram { id: MEMO_PROGRAM, name: "memo", label: Some("spl-memo"), kind: ProgramKind::Other },
    KnownProgram { id: COMPUTE_BUDGET_PROGRAM, name: "compute_budget", label: None, kind: ProgramKind::Other },
    KnownProgram { id: JUPITER_PROGRAM, name: "jupiter", label: None, kind: ProgramKind::Other },
    KnownProgram { id: RAYDIUM_AMM_PROGRAM, name: "raydium_amm", label: None, kind: ProgramKind::Other },
    KnownProgram { id: ORCA_WHIRLPOOL_PROGRAM, name: "orca_whirlpool", label: None, kind: ProgramKind::Other },
];

/// Look up a program by id, falling back to the provider label.
pub fn resolve(program_id: Option<&str>, label: Option<&str>) -> Option<&'static KnownProgram> {
    if let Some(id) = program_id {
        if let Some(program) = KNOWN_PROGRAMS.iter().find(|p| p.id == id) {
            return Some(program);
        }
    }
    let label = label?;
    KNOWN_PROGRAMS.iter().find(|p| p.label == Some(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_id_and_label() {
        assert_eq!(resolve(Some(VOTE_PROGRAM), None).unwrap().kind, ProgramKind::Vote);
        assert_eq!(resolve(None, Some("spl-token")).unwrap().id, TOKEN_PROGRAM);
        assert!(resolve(Some("Unrecognized1111"), Some("mystery")).is_none());
    }
}
