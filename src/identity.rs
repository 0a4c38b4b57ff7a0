use std::{borrow::Borrow, fmt, ops::Deref, rc::Rc};

/// A symbolic name, unique within the trace that allocated it.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Name(Rc<str>);

impl Name {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(Rc::from(s))
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(Rc::from(s))
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Source of candidate names. A trace rejects candidates that collide with
/// names it already holds, so generators need not track registrations.
pub trait NameGenerator {
    fn fresh(&mut self) -> Name;
}

pub mod generators {
    use crate::identity::{Name, NameGenerator};

    /// `t0`, `t1`, ... Names are never handed out twice.
    #[derive(Debug, Clone)]
    pub struct Counter {
        prefix: String,
        counter: usize,
    }

    impl Counter {
        pub fn new() -> Counter {
            Self::with_prefix("t")
        }

        pub fn with_prefix(prefix: impl Into<String>) -> Counter {
            Self {
                prefix: prefix.into(),
                counter: 0,
            }
        }
    }

    impl Default for Counter {
        fn default() -> Self {
            Self::new()
        }
    }

    impl NameGenerator for Counter {
        fn fresh(&mut self) -> Name {
            let name = format!("{}{}", self.prefix, self.counter);
            self.counter += 1;
            Name::from(name)
        }
    }
}
