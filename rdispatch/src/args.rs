//! Call argument lists.

/// A single supplied argument, optionally named.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg<V> {
    pub name: Option<String>,
    pub value: V,
}

impl<V> Arg<V> {
    pub fn positional(value: V) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: V) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// The ordered arguments of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgs<V> {
    args: Vec<Arg<V>>,
}

impl<V> CallArgs<V> {
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// Positional arguments from plain values.
    pub fn positional(values: impl IntoIterator<Item = V>) -> Self {
        values.into_iter().map(Arg::positional).collect()
    }

    pub fn push(&mut self, arg: Arg<V>) {
        self.args.push(arg);
    }

    /// The dispatch receiver: the first argument.
    pub fn receiver(&self) -> Option<&V> {
        self.args.first().map(|arg| &arg.value)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg<V>> {
        self.args.iter()
    }

    /// Argument names in order; `None` for positional arguments.
    pub fn names(&self) -> impl Iterator<Item = Option<&str>> {
        self.args.iter().map(|arg| arg.name.as_deref())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.args.iter().map(|arg| &arg.value)
    }

    /// These arguments followed by `extra`. Existing positions are kept.
    pub fn merged(&self, extra: CallArgs<V>) -> CallArgs<V>
    where
        V: Clone,
    {
        let mut args = Vec::with_capacity(self.args.len() + extra.args.len());
        args.extend(self.args.iter().cloned());
        args.extend(extra.args);
        Self { args }
    }
}

impl<V> Default for CallArgs<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<Arg<V>> for CallArgs<V> {
    fn from_iter<I: IntoIterator<Item = Arg<V>>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().collect(),
        }
    }
}

impl<V> IntoIterator for CallArgs<V> {
    type Item = Arg<V>;
    type IntoIter = std::vec::IntoIter<Arg<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_appends_after_original() {
        let original = CallArgs::positional(["x", "y"]);
        let extra = CallArgs::positional(["z"]);

        let merged = original.merged(extra);
        assert_eq!(merged.values().copied().collect::<Vec<_>>(), vec!["x", "y", "z"]);
        // The original list is untouched.
        assert_eq!(original.len(), 2);
    }

    #[test]
    fn test_merge_keeps_names() {
        let original: CallArgs<i32> = [Arg::positional(1), Arg::named("digits", 3)]
            .into_iter()
            .collect();
        let extra: CallArgs<i32> = [Arg::named("digits", 5)].into_iter().collect();

        let merged = original.merged(extra);
        assert_eq!(
            merged.names().collect::<Vec<_>>(),
            vec![None, Some("digits"), Some("digits")]
        );
        assert_eq!(merged.values().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
    }

    #[test]
    fn test_receiver() {
        assert_eq!(CallArgs::positional([4, 5]).receiver(), Some(&4));
        assert_eq!(CallArgs::<i32>::new().receiver(), None);
    }
}
