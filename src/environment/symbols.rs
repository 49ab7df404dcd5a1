//! Symbol table - runtime symbols keying metadata on wrappers and class templates

/// Metadata slots known to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Native class id of a bound wrapper
    ClassId,
    ClassSignals,
    ClassProperties,
    ClassImplicitReadyFuncs,
    ClassToolScript,
    ClassIcon,
    /// Wrapper created from script and bound to a fresh native object
    CrossBind,
}

impl Symbol {
    pub const ALL: [Symbol; 7] = [
        Symbol::ClassId,
        Symbol::ClassSignals,
        Symbol::ClassProperties,
        Symbol::ClassImplicitReadyFuncs,
        Symbol::ClassToolScript,
        Symbol::ClassIcon,
        Symbol::CrossBind,
    ];

    pub fn description(self) -> &'static str {
        match self {
            Symbol::ClassId => "class_id",
            Symbol::ClassSignals => "class_signals",
            Symbol::ClassProperties => "class_properties",
            Symbol::ClassImplicitReadyFuncs => "class_implicit_ready_funcs",
            Symbol::ClassToolScript => "class_tool_script",
            Symbol::ClassIcon => "class_icon",
            Symbol::CrossBind => "cross_bind",
        }
    }
}

/// One runtime symbol per [`Symbol`], created when the environment is
pub struct SymbolTable<S> {
    symbols: Vec<S>,
}

impl<S> SymbolTable<S> {
    pub fn new(mut create: impl FnMut(&'static str) -> S) -> Self {
        Self {
            symbols: Symbol::ALL.iter().map(|symbol| create(symbol.description())).collect(),
        }
    }

    #[inline]
    pub fn get(&self, symbol: Symbol) -> &S {
        &self.symbols[symbol as usize]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
