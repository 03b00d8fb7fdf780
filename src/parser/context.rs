//! Execution Context
//!
//! Carries everything an evaluating expression or user command may touch:
//! the catalog, the persisted command root, the variable tree, the output
//! buffer, a logger handle and the cancellation token. `new_scope`
//! derives a child with fresh locals; `copy` derives a structurally
//! independent context over the same trees.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::watch;

use super::trie::CommandTree;
use super::types::EvalError;
use super::value::Value;
use super::variables::{Binding, VariableTree};
use crate::shell::buffer::OutputBuffer;

/// Thin logging handle exposed to user commands; forwards to `tracing`.
#[derive(Clone, Default)]
pub struct Logger;

impl Logger {
    pub fn write(&self, message: &str) {
        tracing::info!(target: "treesh::exec", "{message}");
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(target: "treesh::exec", "{message}");
    }
}

#[derive(Clone)]
struct ContextInner {
    command_tree: Rc<CommandTree>,
    command_root: Rc<CommandTree>,
    variables: Rc<RefCell<VariableTree>>,
    buffer: Rc<RefCell<OutputBuffer>>,
    logger: Logger,
    cancel: watch::Receiver<bool>,
}

/// Cloning yields the same context identity; use `copy`/`new_scope` for
/// derived contexts.
#[derive(Clone)]
pub struct ExecContext {
    inner: Rc<RefCell<ContextInner>>,
}

impl ExecContext {
    pub fn root(
        catalog: Rc<CommandTree>,
        buffer: Rc<RefCell<OutputBuffer>>,
        cancel: watch::Receiver<bool>,
    ) -> ExecContext {
        ExecContext {
            inner: Rc::new(RefCell::new(ContextInner {
                command_root: Rc::clone(&catalog),
                command_tree: catalog,
                variables: Rc::new(RefCell::new(VariableTree::new())),
                buffer,
                logger: Logger,
                cancel,
            })),
        }
    }

    /// A child context with fresh locals: globals shared, local tree
    /// copied, command root reset to the absolute catalog.
    pub fn new_scope(&self) -> ExecContext {
        let inner = self.inner.borrow();
        let copied_variables = inner.variables.borrow().copy();
        ExecContext {
            inner: Rc::new(RefCell::new(ContextInner {
                command_tree: Rc::clone(&inner.command_tree),
                command_root: Rc::clone(&inner.command_tree),
                variables: Rc::new(RefCell::new(copied_variables)),
                buffer: Rc::clone(&inner.buffer),
                logger: inner.logger.clone(),
                cancel: inner.cancel.clone(),
            })),
        }
    }

    /// A structurally independent context over the same trees; later root
    /// changes on the copy do not affect the original.
    pub fn copy(&self) -> ExecContext {
        ExecContext {
            inner: Rc::new(RefCell::new(self.inner.borrow().clone())),
        }
    }

    pub fn command_tree(&self) -> Rc<CommandTree> {
        Rc::clone(&self.inner.borrow().command_tree)
    }

    pub fn command_root(&self) -> Rc<CommandTree> {
        Rc::clone(&self.inner.borrow().command_root)
    }

    pub fn set_command_root(&self, root: Rc<CommandTree>) {
        self.inner.borrow_mut().command_root = root;
    }

    pub fn variables(&self) -> Rc<RefCell<VariableTree>> {
        Rc::clone(&self.inner.borrow().variables)
    }

    pub fn set_global(&self, name: &str, payload: Binding) {
        self.inner.borrow().variables.borrow().add_global(name, payload);
    }

    pub fn set_local(&self, name: &str, payload: Binding) {
        self.inner
            .borrow()
            .variables
            .borrow_mut()
            .add_local(name, payload);
    }

    /// Resolves a variable to a value; a callable binding is evaluated
    /// against this context. Unknown names read as null.
    pub fn get_variable(&self, name: &str) -> Result<Value, EvalError> {
        let binding = self.variables().borrow().get(name);
        match binding {
            None => Ok(Value::null()),
            Some(Binding::Value(v)) => Ok(v),
            Some(Binding::Callable(e)) => e.borrow().value(self),
        }
    }

    pub fn variable_exists(&self, name: &str) -> bool {
        self.variables().borrow().exists(name)
    }

    pub fn buffer(&self) -> Rc<RefCell<OutputBuffer>> {
        Rc::clone(&self.inner.borrow().buffer)
    }

    pub fn logger(&self) -> Logger {
        self.inner.borrow().logger.clone()
    }

    /// True once the shell has signalled cancellation; long-running user
    /// commands are expected to poll this.
    pub fn cancelled(&self) -> bool {
        *self.inner.borrow().cancel.borrow()
    }

    #[cfg(test)]
    pub fn test() -> ExecContext {
        let (_tx, rx) = watch::channel(false);
        ExecContext::root(
            Rc::new(CommandTree::new()),
            Rc::new(RefCell::new(OutputBuffer::new())),
            rx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_visible_in_children() {
        let root = ExecContext::test();
        root.set_global("n", Binding::Value(Value::Number(1)));

        let child = root.new_scope();
        let copied = root.copy();
        assert_eq!(child.get_variable("n").unwrap().as_number(), 1);
        assert_eq!(copied.get_variable("n").unwrap().as_number(), 1);

        // and the other way around: globals set in a child reach the root
        child.set_global("m", Binding::Value(Value::Number(2)));
        assert_eq!(root.get_variable("m").unwrap().as_number(), 2);
    }

    #[test]
    fn test_local_scope_isolation() {
        let root = ExecContext::test();
        let child = root.new_scope();
        child.set_local("n", Binding::Value(Value::Number(1)));

        assert_eq!(child.get_variable("n").unwrap().as_number(), 1);
        assert!(!root.variable_exists("n"));
        assert!(root.get_variable("n").unwrap().is_null());
    }

    #[test]
    fn test_copy_shares_variable_tree() {
        let root = ExecContext::test();
        let copied = root.copy();
        copied.set_local("n", Binding::Value(Value::Number(1)));
        assert!(root.variable_exists("n"));
    }

    #[test]
    fn test_copy_isolates_command_root() {
        let root = ExecContext::test();
        let copied = root.copy();
        let other = Rc::new(CommandTree::new());
        copied.set_command_root(Rc::clone(&other));
        assert!(!Rc::ptr_eq(&root.command_root(), &other));
    }
}
