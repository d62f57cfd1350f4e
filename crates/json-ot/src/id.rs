//! Node id minting.

/// Identity of a node, unique within one document.
pub type NodeId = String;

/// Source of fresh node ids, injected into a [`Model`](crate::Model).
///
/// Any `FnMut() -> NodeId` closure is a generator.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> NodeId;
}

impl<F> IdGenerator for F
where
    F: FnMut() -> NodeId + Send,
{
    fn next_id(&mut self) -> NodeId {
        self()
    }
}

/// Produces `"{prefix}:{counter}"` ids.
///
/// Prefixing with the session id keeps ids minted by different sessions of
/// the same document disjoint.
#[derive(Debug, Clone)]
pub struct SessionIdGenerator {
    prefix: String,
    counter: u64,
}

impl SessionIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl IdGenerator for SessionIdGenerator {
    fn next_id(&mut self) -> NodeId {
        self.counter += 1;
        format!("{}:{}", self.prefix, self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_prefixed_and_sequential() {
        let mut ids = SessionIdGenerator::new("s1");
        assert_eq!(ids.next_id(), "s1:1");
        assert_eq!(ids.next_id(), "s1:2");
    }

    #[test]
    fn closures_are_generators() {
        let mut n = 0;
        let mut next = move || {
            n += 1;
            format!("x{n}")
        };
        assert_eq!(IdGenerator::next_id(&mut next), "x1");
    }
}
