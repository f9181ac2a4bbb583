use crate::value::{Symbol, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    // primitive syntax
    Quote,
    Define,
    SetBang,
    If,
    Lambda,
    Begin,

    // derived syntax, rewritten before evaluation
    Cond,
    Let,
    And,
    Or,
}

macro_rules! keywords {
    ($($field:ident = $name:literal),* $(,)?) => {
        /// The symbols the evaluator and desugarer recognize, interned once at startup.
        pub(crate) struct Keywords {
            $(pub(crate) $field: Symbol,)*
        }

        impl Keywords {
            pub(crate) fn new(symbols: &mut SymbolTable) -> Self {
                Self {
                    $($field: symbols.intern($name),)*
                }
            }
        }
    };
}

keywords! {
    quote = "quote",
    define = "define",
    set = "set!",
    if_ = "if",
    lambda = "lambda",
    begin = "begin",
    cond = "cond",
    let_ = "let",
    and = "and",
    or = "or",
    else_ = "else",
    arrow = "=>",
    // what mutators and `set!` answer with
    ok = "OK",
}

impl Keywords {
    /// The special form introduced by `head`, if any.
    ///
    /// Keywords are recognized by symbol identity whatever the environment
    /// binds them to, so they can't be shadowed.
    pub(crate) fn special_form(&self, head: &Symbol) -> Option<SpecialForm> {
        let table = [
            (&self.quote, SpecialForm::Quote),
            (&self.define, SpecialForm::Define),
            (&self.set, SpecialForm::SetBang),
            (&self.if_, SpecialForm::If),
            (&self.lambda, SpecialForm::Lambda),
            (&self.begin, SpecialForm::Begin),
            (&self.cond, SpecialForm::Cond),
            (&self.let_, SpecialForm::Let),
            (&self.and, SpecialForm::And),
            (&self.or, SpecialForm::Or),
        ];
        table
            .into_iter()
            .find(|(keyword, _)| *keyword == head)
            .map(|(_, form)| form)
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use crate::value::SymbolTable;

    use super::{Keywords, SpecialForm};

    #[test]
    fn keywords_are_recognized_by_identity() {
        let mut symbols = SymbolTable::new();
        let keywords = Keywords::new(&mut symbols);
        check!(keywords.special_form(&symbols.intern("if")) == Some(SpecialForm::If));
        check!(keywords.special_form(&symbols.intern("let")) == Some(SpecialForm::Let));
        check!(keywords.special_form(&symbols.intern("car")).is_none());
        check!(keywords.special_form(&symbols.gensym("if")).is_none());
    }
}
