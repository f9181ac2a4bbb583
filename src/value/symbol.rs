//! Interned symbols
use core::fmt;
use std::rc::Rc;

use lasso::{Key, Rodeo, Spur};

/// A symbol, compared by identity.
///
/// Interned symbols are owned by the [`SymbolTable`] for the life of the interpreter,
/// so there is at most one of them per name. Symbols made by [`SymbolTable::gensym`]
/// are never entered into the table and can't be reached by name.
#[derive(Clone)]
pub struct Symbol(Rc<SymbolData>);

struct SymbolData {
    name: Box<str>,
    key: Option<Spur>,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_interned(&self) -> bool {
        self.0.key.is_some()
    }

    pub fn ptr_eq(&self, other: &Symbol) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Symbol {}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_interned() {
            write!(f, "Symbol({})", self.name())
        } else {
            write!(f, "Symbol({} {:p})", self.name(), Rc::as_ptr(&self.0))
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Append-only table mapping names to their one interned [`Symbol`].
#[derive(Default)]
pub struct SymbolTable {
    /// interner
    rodeo: Rodeo,
    /// indexed by the rodeo key of each name
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the symbol for `name`, creating it the first time the name is seen.
    pub fn intern(&mut self, name: impl AsRef<str>) -> Symbol {
        let name = name.as_ref();
        if let Some(key) = self.rodeo.get(name) {
            return self.symbols[key.into_usize()].clone();
        }

        let key = self.rodeo.get_or_intern(name);
        debug_assert_eq!(key.into_usize(), self.symbols.len());
        let symbol = Symbol(Rc::new(SymbolData {
            name: Box::from(name),
            key: Some(key),
        }));
        self.symbols.push(symbol.clone());
        symbol
    }

    /// A fresh symbol that is not in the table, so no name read or interned
    /// later can ever be identical to it.
    pub fn gensym(&self, name: impl AsRef<str>) -> Symbol {
        Symbol(Rc::new(SymbolData {
            name: Box::from(name.as_ref()),
            key: None,
        }))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use arbtest::arbtest;
    use assert2::check;

    use super::SymbolTable;

    #[test]
    fn interning_returns_the_same_symbol() {
        let mut table = SymbolTable::new();
        let a = table.intern("lambda");
        let b = table.intern(String::from("lambda"));
        check!(a.ptr_eq(&b));
        check!(table.len() == 1);
        check!(table.intern("define") != a);
        check!(table.len() == 2);
    }

    #[test]
    fn gensyms_never_collide_with_interned_names() {
        let mut table = SymbolTable::new();
        let temp = table.gensym("temp");
        let interned = table.intern("temp");
        check!(temp != interned);
        check!(temp != table.gensym("temp"));
        check!(!temp.is_interned());
        check!(temp.name() == interned.name());
    }

    #[test]
    fn interning_is_identity_for_arbitrary_names() {
        arbtest(|u| {
            let names: Vec<String> = u.arbitrary()?;
            let mut table = SymbolTable::new();
            let first = names.iter().map(|n| table.intern(n)).collect::<Vec<_>>();
            let second = names.iter().map(|n| table.intern(n)).collect::<Vec<_>>();
            for (a, b) in first.iter().zip(&second) {
                check!(a.ptr_eq(b));
            }
            let mut distinct = names.clone();
            distinct.sort();
            distinct.dedup();
            check!(table.len() == distinct.len());
            Ok(())
        });
    }
}
