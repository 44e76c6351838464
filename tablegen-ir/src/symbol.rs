use std::cmp::Ordering;
use std::fmt;

/// The role a [`Symbol`] plays in the grammar it was allocated from.
///
/// Declaration order doubles as the tie-break ordering used by [`Symbol`]'s
/// `Ord` impl whenever two symbols share a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolKind {
    Terminal,
    NonTerminal,
    External,
    BuiltIn,
    Auxiliary,
}

/// A grammar symbol: an index scoped to its `kind`'s own namespace.
///
/// Two symbols are equal iff both fields match; indices are not unique
/// across kinds; e.g. `Symbol::terminal(0)` and `Symbol::non_terminal(0)`
/// are distinct symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub index: u32,
    pub kind: SymbolKind,
}

impl Symbol {
    /// Reserved built-in symbol signalling the end of input.
    pub const END_OF_INPUT: Symbol = Symbol {
        index: 0,
        kind: SymbolKind::BuiltIn,
    };

    /// Reserved built-in symbol used for error recovery.
    pub const ERROR: Symbol = Symbol {
        index: 1,
        kind: SymbolKind::BuiltIn,
    };

    pub fn terminal(index: u32) -> Self {
        Symbol {
            index,
            kind: SymbolKind::Terminal,
        }
    }

    pub fn non_terminal(index: u32) -> Self {
        Symbol {
            index,
            kind: SymbolKind::NonTerminal,
        }
    }

    pub fn external(index: u32) -> Self {
        Symbol {
            index,
            kind: SymbolKind::External,
        }
    }

    pub fn auxiliary(index: u32) -> Self {
        Symbol {
            index,
            kind: SymbolKind::Auxiliary,
        }
    }

    pub fn is_built_in(&self) -> bool {
        self.kind == SymbolKind::BuiltIn
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == SymbolKind::Terminal
    }

    pub fn is_non_terminal(&self) -> bool {
        self.kind == SymbolKind::NonTerminal
    }

    pub fn is_external(&self) -> bool {
        self.kind == SymbolKind::External
    }

    pub fn is_auxiliary(&self) -> bool {
        self.kind == SymbolKind::Auxiliary
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind.cmp(&other.kind).then(self.index.cmp(&other.index))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            SymbolKind::Terminal => "term",
            SymbolKind::NonTerminal => "nt",
            SymbolKind::External => "ext",
            SymbolKind::BuiltIn => "builtin",
            SymbolKind::Auxiliary => "aux",
        };
        write!(f, "{}#{}", tag, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_groups_by_kind_first() {
        let t1 = Symbol::terminal(5);
        let nt0 = Symbol::non_terminal(0);
        assert!(t1 < nt0, "Terminal kind sorts before NonTerminal regardless of index");
    }

    #[test]
    fn ordering_breaks_ties_by_index() {
        let t0 = Symbol::terminal(0);
        let t1 = Symbol::terminal(1);
        assert!(t0 < t1);
    }

    #[test]
    fn only_built_in_symbols_report_is_built_in() {
        assert!(Symbol::END_OF_INPUT.is_built_in());
        assert!(!Symbol::terminal(0).is_built_in());
    }
}
