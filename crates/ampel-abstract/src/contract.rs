// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Definition-time contract checks for unit classes.
//!
//! A [`ClassDecl`] names its bases and methods. [`ContractChecker::define`]
//! linearises the hierarchy (C3), decides whether the class is abstract
//! (explicitly marked, or declared without bases) and, for concrete classes,
//! verifies that every abstract method reachable through the hierarchy
//! resolves to a concrete implementation whose parameter list satisfies the
//! checker's [`SignaturePolicy`]. Classes that fail never come into existence.
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

/// Errors raised while defining or instantiating classes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// A concrete class leaves an abstract method without implementation.
    #[error("{class} does not implement abstract method '{method}' declared in {declared_in}")]
    UnimplementedAbstractMethod {
        /// Offending class.
        class: String,
        /// Method name.
        method: String,
        /// Class carrying the abstract declaration.
        declared_in: String,
    },
    /// An implementation's parameters differ from the abstract declaration.
    #[error(
        "{class}.{method}: expected parameters ({}), found ({})",
        .expected.join(", "),
        .found.join(", ")
    )]
    SignatureMismatch {
        /// Offending class.
        class: String,
        /// Method name.
        method: String,
        /// Parameters of the abstract declaration.
        expected: Vec<String>,
        /// Parameters of the implementation.
        found: Vec<String>,
    },
    /// Attempt to instantiate an abstract class.
    #[error("cannot instantiate abstract class {class}")]
    AbstractInstantiation {
        /// The abstract class.
        class: String,
    },
    /// The bases admit no consistent method resolution order.
    #[error("cannot create a consistent method resolution order for {class}")]
    InconsistentHierarchy {
        /// Class being defined.
        class: String,
    },
    /// One declaration lists the same method twice.
    #[error("{class} declares method '{method}' more than once")]
    DuplicateMethod {
        /// Class being defined.
        class: String,
        /// Method name.
        method: String,
    },
}

/// How implementations are compared with abstract declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignaturePolicy {
    /// Same parameter names in the same order.
    #[default]
    Exact,
    /// Same number of parameters.
    Arity,
    /// Only the presence of an implementation is checked.
    Disabled,
}

impl SignaturePolicy {
    fn accepts(self, expected: &[String], found: &[String]) -> bool {
        match self {
            Self::Exact => expected == found,
            Self::Arity => expected.len() == found.len(),
            Self::Disabled => true,
        }
    }
}

/// One method of a class declaration. Parameters exclude the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDecl {
    name: String,
    params: Vec<String>,
    is_abstract: bool,
}

impl MethodDecl {
    /// An implemented method.
    pub fn concrete(name: impl Into<String>, params: &[&str]) -> Self {
        Self::build(name.into(), params, false)
    }

    /// A method subclasses must implement.
    pub fn required(name: impl Into<String>, params: &[&str]) -> Self {
        Self::build(name.into(), params, true)
    }

    fn build(name: String, params: &[&str], is_abstract: bool) -> Self {
        Self {
            name,
            params: params.iter().map(|p| (*p).to_owned()).collect(),
            is_abstract,
        }
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter names in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Whether this declaration is abstract.
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Same parameters, no longer abstract.
    #[must_use]
    pub fn implemented(&self) -> Self {
        Self {
            is_abstract: false,
            ..self.clone()
        }
    }
}

/// Class declaration handed to [`ContractChecker::define`].
#[derive(Debug, Clone)]
pub struct ClassDecl {
    name: String,
    bases: Vec<Arc<Class>>,
    marked_abstract: bool,
    methods: Vec<MethodDecl>,
}

impl ClassDecl {
    /// Empty declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            marked_abstract: false,
            methods: Vec::new(),
        }
    }

    /// Appends a base class (bases keep declaration order).
    #[must_use]
    pub fn extends(mut self, base: &Arc<Class>) -> Self {
        self.bases.push(Arc::clone(base));
        self
    }

    /// Marks the class abstract even though it has bases.
    #[must_use]
    pub fn mark_abstract(mut self) -> Self {
        self.marked_abstract = true;
        self
    }

    /// Declares an abstract method.
    #[must_use]
    pub fn abstract_method(self, name: &str, params: &[&str]) -> Self {
        self.with(MethodDecl::required(name, params))
    }

    /// Declares an implemented method.
    #[must_use]
    pub fn method(self, name: &str, params: &[&str]) -> Self {
        self.with(MethodDecl::concrete(name, params))
    }

    /// Adds a prepared method declaration.
    #[must_use]
    pub fn with(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    /// Declared name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A checked class.
pub struct Class {
    name: String,
    bases: Vec<Arc<Class>>,
    ancestors: Vec<Arc<Class>>,
    is_abstract: bool,
    methods: Vec<MethodDecl>,
}

impl Class {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the class is abstract.
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Direct bases in declaration order.
    pub fn bases(&self) -> &[Arc<Self>] {
        &self.bases
    }

    /// Method resolution order, starting with this class.
    pub fn mro(&self) -> Vec<&str> {
        std::iter::once(self.name())
            .chain(self.ancestors.iter().map(|c| c.name()))
            .collect()
    }

    /// Methods declared by this class itself.
    pub fn own_methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    fn own_method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    fn chain(&self) -> impl Iterator<Item = &Self> {
        std::iter::once(self).chain(self.ancestors.iter().map(AsRef::as_ref))
    }

    /// Resolves `name` along the method resolution order, returning the
    /// defining class name and the declaration.
    pub fn resolve(&self, name: &str) -> Option<(&str, &MethodDecl)> {
        self.chain()
            .find_map(|c| c.own_method(name).map(|m| (c.name(), m)))
    }

    /// Abstract declarations still unresolved on this class, in resolution
    /// order.
    pub fn abstract_methods(&self) -> Vec<&MethodDecl> {
        self.method_names()
            .into_iter()
            .filter_map(|n| self.resolve(n))
            .filter(|(_, m)| m.is_abstract)
            .map(|(_, m)| m)
            .collect()
    }

    /// Every method name reachable through the hierarchy, first occurrence
    /// first.
    pub fn method_names(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.chain()
            .flat_map(|c| c.methods.iter().map(MethodDecl::name))
            .filter(|n| seen.insert(*n))
            .collect()
    }

    /// Whether `other` is this class or one of its ancestors.
    pub fn is_subclass_of(&self, other: &Self) -> bool {
        self.chain().any(|c| std::ptr::eq(c, other))
    }

    /// Creates an instance, failing for abstract classes.
    pub fn instantiate(self: &Arc<Self>) -> Result<Instance, ContractError> {
        if self.is_abstract {
            return Err(ContractError::AbstractInstantiation {
                class: self.name.clone(),
            });
        }
        Ok(Instance {
            class: Arc::clone(self),
        })
    }

    fn linearization(self: &Arc<Self>) -> Vec<Arc<Self>> {
        std::iter::once(Arc::clone(self))
            .chain(self.ancestors.iter().cloned())
            .collect()
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("is_abstract", &self.is_abstract)
            .field("mro", &self.mro())
            .field("methods", &self.methods)
            .finish()
    }
}

/// Instance of a concrete class.
#[derive(Debug, Clone)]
pub struct Instance {
    class: Arc<Class>,
}

impl Instance {
    /// The instantiated class.
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Whether the instance's class is `class` or derives from it.
    pub fn is_instance_of(&self, class: &Class) -> bool {
        self.class.is_subclass_of(class)
    }
}

/// Validates class declarations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractChecker {
    policy: SignaturePolicy,
}

impl ContractChecker {
    /// Checker applying `policy`.
    pub const fn new(policy: SignaturePolicy) -> Self {
        Self { policy }
    }

    /// Active signature policy.
    pub const fn policy(&self) -> SignaturePolicy {
        self.policy
    }

    /// Checks `decl` and returns the defined class.
    pub fn define(&self, decl: ClassDecl) -> Result<Arc<Class>, ContractError> {
        let ClassDecl {
            name,
            bases,
            marked_abstract,
            methods,
        } = decl;
        let mut names = BTreeSet::new();
        if let Some(dup) = methods.iter().find(|m| !names.insert(m.name.as_str())) {
            return Err(ContractError::DuplicateMethod {
                class: name,
                method: dup.name.clone(),
            });
        }
        let ancestors = c3_merge(&name, &bases)?;
        let class = Class {
            is_abstract: marked_abstract || bases.is_empty(),
            name,
            bases,
            ancestors,
            methods,
        };
        if !class.is_abstract {
            self.verify(&class)?;
        }
        debug!(class = %class.name, is_abstract = class.is_abstract, "class defined");
        Ok(Arc::new(class))
    }

    fn verify(&self, class: &Class) -> Result<(), ContractError> {
        for name in class.method_names() {
            let Some(declared) = class
                .chain()
                .find_map(|c| c.own_method(name).filter(|m| m.is_abstract).map(|m| (c, m)))
            else {
                continue;
            };
            let (declared_in, expected) = declared;
            let Some((_, found)) = class.resolve(name) else {
                continue;
            };
            if found.is_abstract {
                return Err(ContractError::UnimplementedAbstractMethod {
                    class: class.name.clone(),
                    method: name.to_owned(),
                    declared_in: declared_in.name.clone(),
                });
            }
            if !self.policy.accepts(&expected.params, &found.params) {
                return Err(ContractError::SignatureMismatch {
                    class: class.name.clone(),
                    method: name.to_owned(),
                    expected: expected.params.clone(),
                    found: found.params.clone(),
                });
            }
        }
        Ok(())
    }
}

fn c3_merge(name: &str, bases: &[Arc<Class>]) -> Result<Vec<Arc<Class>>, ContractError> {
    let mut seqs: Vec<Vec<Arc<Class>>> = bases.iter().map(Class::linearization).collect();
    seqs.push(bases.to_vec());
    let mut out = Vec::new();
    loop {
        seqs.retain(|s| !s.is_empty());
        if seqs.is_empty() {
            return Ok(out);
        }
        let head = seqs
            .iter()
            .filter_map(|s| s.first())
            .find(|h| {
                !seqs
                    .iter()
                    .any(|s| s.iter().skip(1).any(|c| Arc::ptr_eq(c, h)))
            })
            .cloned()
            .ok_or_else(|| ContractError::InconsistentHierarchy {
                class: name.to_owned(),
            })?;
        for seq in &mut seqs {
            if seq.first().is_some_and(|c| Arc::ptr_eq(c, &head)) {
                seq.remove(0);
            }
        }
        out.push(head);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn root(checker: ContractChecker) -> Arc<Class> {
        checker
            .define(ClassDecl::new("Base").abstract_method("run", &["light_curve", "run_config"]))
            .unwrap()
    }

    #[test]
    fn class_without_bases_is_abstract() {
        let base = root(ContractChecker::default());
        assert!(base.is_abstract());
        assert_eq!(
            base.instantiate().unwrap_err(),
            ContractError::AbstractInstantiation {
                class: "Base".into()
            }
        );
    }

    #[test]
    fn missing_implementation_is_rejected() {
        let checker = ContractChecker::default();
        let base = root(checker);
        let err = checker
            .define(ClassDecl::new("Lazy").extends(&base))
            .unwrap_err();
        assert_eq!(
            err,
            ContractError::UnimplementedAbstractMethod {
                class: "Lazy".into(),
                method: "run".into(),
                declared_in: "Base".into(),
            }
        );
    }

    #[test]
    fn policies_differ_on_renamed_parameters() {
        let exact = ContractChecker::new(SignaturePolicy::Exact);
        let base = root(exact);
        let renamed = || ClassDecl::new("Renamed").extends(&base).method("run", &["lc", "cfg"]);
        assert!(matches!(
            exact.define(renamed()),
            Err(ContractError::SignatureMismatch { .. })
        ));
        assert!(ContractChecker::new(SignaturePolicy::Arity)
            .define(renamed())
            .is_ok());
        let short = ClassDecl::new("Short").extends(&base).method("run", &["lc"]);
        assert!(ContractChecker::new(SignaturePolicy::Arity)
            .define(short.clone())
            .is_err());
        assert!(ContractChecker::new(SignaturePolicy::Disabled)
            .define(short)
            .is_ok());
    }

    #[test]
    fn intermediate_implementation_satisfies_descendants() {
        let checker = ContractChecker::default();
        let base = root(checker);
        let mid = checker
            .define(
                ClassDecl::new("Mid")
                    .extends(&base)
                    .mark_abstract()
                    .method("run", &["light_curve", "run_config"])
                    .abstract_method("describe", &[]),
            )
            .unwrap();
        assert!(checker
            .define(ClassDecl::new("Leaf").extends(&mid))
            .is_err());
        let leaf = checker
            .define(ClassDecl::new("Leaf").extends(&mid).method("describe", &[]))
            .unwrap();
        let instance = leaf.instantiate().unwrap();
        assert!(instance.is_instance_of(&base));
        assert_eq!(leaf.mro(), vec!["Leaf", "Mid", "Base"]);
    }

    #[test]
    fn c3_linearisation() {
        let checker = ContractChecker::new(SignaturePolicy::Disabled);
        let o = checker.define(ClassDecl::new("O")).unwrap();
        let a = checker.define(ClassDecl::new("A").extends(&o)).unwrap();
        let b = checker.define(ClassDecl::new("B").extends(&o)).unwrap();
        let c = checker
            .define(ClassDecl::new("C").extends(&a).extends(&b))
            .unwrap();
        assert_eq!(c.mro(), vec!["C", "A", "B", "O"]);
        assert_eq!(
            checker
                .define(ClassDecl::new("X").extends(&o).extends(&a))
                .unwrap_err(),
            ContractError::InconsistentHierarchy { class: "X".into() }
        );
    }

    #[test]
    fn duplicate_method_names_are_rejected() {
        assert!(matches!(
            ContractChecker::default()
                .define(ClassDecl::new("D").method("a", &[]).method("a", &["x"])),
            Err(ContractError::DuplicateMethod { .. })
        ));
    }
}
