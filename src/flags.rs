use std::{fmt, ops::BitOr, str::FromStr};

use crate::Error;

/// Firing policy of a [`Callbacks`](crate::Callbacks) list.
///
/// Flags are usually written as a space separated string, the same way they
/// are spelled when the three lists of a process are created.
///
/// ```
/// use deferred_process::Flags;
///
/// let flags: Flags = "once memory".parse().unwrap();
/// assert_eq!(flags, Flags::ONCE | Flags::MEMORY);
/// assert!("memory forever".parse::<Flags>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    /// The list fires at most once.
    pub once: bool,
    /// The last firing is remembered and replayed to late handlers.
    pub memory: bool,
}

impl Flags {
    pub const NONE: Flags = Flags {
        once: false,
        memory: false,
    };
    pub const ONCE: Flags = Flags {
        once: true,
        memory: false,
    };
    pub const MEMORY: Flags = Flags {
        once: false,
        memory: true,
    };
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags {
            once: self.once || rhs.once,
            memory: self.memory || rhs.memory,
        }
    }
}

impl FromStr for Flags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace().try_fold(Flags::NONE, |flags, word| match word {
            "once" => Ok(flags | Flags::ONCE),
            "memory" => Ok(flags | Flags::MEMORY),
            other => Err(Error::UnknownFlag(other.to_owned())),
        })
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<&str> = [(self.once, "once"), (self.memory, "memory")]
            .into_iter()
            .filter_map(|(set, word)| set.then_some(word))
            .collect();
        f.write_str(&words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::Flags;
    use crate::Error;

    #[test]
    fn test_parse_flags() {
        assert_eq!("".parse::<Flags>().unwrap(), Flags::NONE);
        assert_eq!("memory".parse::<Flags>().unwrap(), Flags::MEMORY);
        assert_eq!(
            "  memory   once ".parse::<Flags>().unwrap(),
            Flags::ONCE | Flags::MEMORY
        );
    }

    #[test]
    fn test_parse_unknown_flag() {
        match "once unique".parse::<Flags>() {
            Err(Error::UnknownFlag(word)) => assert_eq!(word, "unique"),
            other => panic!("unexpected parse result {:?}", other),
        }
    }

    #[test]
    fn test_display_flags() {
        assert_eq!((Flags::ONCE | Flags::MEMORY).to_string(), "once memory");
        assert_eq!(Flags::MEMORY.to_string(), "memory");
        assert_eq!(Flags::NONE.to_string(), "");
    }
}
