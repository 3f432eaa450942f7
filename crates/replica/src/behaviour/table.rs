use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::error::{ArgumentError, ReplicationError, Result};
use crate::wire::{Category, FromValue, Value, ValueKind};

use super::{Behaviour, CallContext, NetworkIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Command,
    Rpc,
    TargetRpc,
}

impl MethodKind {
    pub fn category(self) -> Category {
        match self {
            MethodKind::Command => Category::Command,
            MethodKind::Rpc => Category::Rpc,
            MethodKind::TargetRpc => Category::TargetRpc,
        }
    }
}

/// Declared parameter kinds of a registered method. Arguments are checked
/// against them before the invoker runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    Exact(Vec<ValueKind>),
    /// Any number of arguments, all of one kind.
    Variadic(ValueKind),
}

impl Params {
    pub fn none() -> Self {
        Params::Exact(Vec::new())
    }

    pub fn accepts_count(&self, count: usize) -> bool {
        match self {
            Params::Exact(kinds) => kinds.len() == count,
            Params::Variadic(_) => true,
        }
    }

    /// Checks every argument against its declared kind, in order.
    pub fn check(&self, args: &[Value]) -> Result<(), ArgumentError> {
        for (index, value) in args.iter().enumerate() {
            let expected = match self {
                Params::Exact(kinds) => match kinds.get(index) {
                    Some(kind) => *kind,
                    None => return Err(ArgumentError::Unexpected { index }),
                },
                Params::Variadic(kind) => *kind,
            };
            if value.kind() != expected {
                return Err(ArgumentError::TypeMismatch {
                    index,
                    expected,
                    actual: value.kind(),
                });
            }
        }
        if let Params::Exact(kinds) = self {
            if args.len() < kinds.len() {
                return Err(ArgumentError::Missing { index: args.len() });
            }
        }
        Ok(())
    }
}

impl From<&[ValueKind]> for Params {
    fn from(kinds: &[ValueKind]) -> Self {
        Params::Exact(kinds.to_vec())
    }
}

impl<const N: usize> From<[ValueKind; N]> for Params {
    fn from(kinds: [ValueKind; N]) -> Self {
        Params::Exact(kinds.to_vec())
    }
}

/// Positional arguments handed to an invoker.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn get<T: FromValue>(&self, index: usize) -> Result<T, ArgumentError> {
        let value = self
            .values
            .get(index)
            .ok_or(ArgumentError::Missing { index })?;
        T::from_value(value).ok_or(ArgumentError::TypeMismatch {
            index,
            expected: T::KIND,
            actual: value.kind(),
        })
    }
}

type InvokeResult = Result<(), ArgumentError>;
type Invoker =
    Box<dyn Fn(&mut dyn Behaviour, &mut CallContext, Args<'_>) -> InvokeResult + Send + Sync>;
type Getter = Box<dyn Fn(&mut dyn Behaviour) -> Result<Value, ArgumentError> + Send + Sync>;
type Setter = Box<dyn Fn(&mut dyn Behaviour, &Value) -> Result<(), ArgumentError> + Send + Sync>;

pub struct MethodEntry {
    pub kind: MethodKind,
    pub params: Params,
    invoke: Invoker,
}

impl MethodEntry {
    pub fn invoke(
        &self,
        behaviour: &mut dyn Behaviour,
        ctx: &mut CallContext,
        args: &[Value],
    ) -> Result<(), ArgumentError> {
        (self.invoke)(behaviour, ctx, Args::new(args))
    }
}

pub struct SyncVarEntry {
    get: Getter,
    set: Setter,
}

impl SyncVarEntry {
    pub fn get(&self, behaviour: &mut dyn Behaviour) -> Result<Value, ArgumentError> {
        (self.get)(behaviour)
    }

    pub fn set(&self, behaviour: &mut dyn Behaviour, value: &Value) -> Result<(), ArgumentError> {
        (self.set)(behaviour, value)
    }
}

/// Methods and synced fields of one behaviour type, keyed by name.
pub struct BehaviourTable {
    type_name: &'static str,
    methods: HashMap<String, MethodEntry>,
    sync_vars: HashMap<String, SyncVarEntry>,
}

impl BehaviourTable {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            methods: HashMap::new(),
            sync_vars: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn method(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.get(name)
    }

    pub fn sync_var(&self, name: &str) -> Option<&SyncVarEntry> {
        self.sync_vars.get(name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

fn downcast<B: Behaviour>(behaviour: &mut dyn Behaviour) -> Result<&mut B, ArgumentError> {
    behaviour
        .as_any_mut()
        .downcast_mut::<B>()
        .ok_or(ArgumentError::WrongBehaviour)
}

/// Builder handed to [`Behaviour::register`].
pub struct Registrar<'a, B> {
    table: &'a mut BehaviourTable,
    _marker: PhantomData<fn(B)>,
}

impl<B: Behaviour> Registrar<'_, B> {
    pub fn method<F>(
        &mut self,
        kind: MethodKind,
        name: &str,
        params: impl Into<Params>,
        f: F,
    ) -> &mut Self
    where
        F: Fn(&mut B, &mut CallContext, Args<'_>) -> Result<(), ArgumentError>
            + Send
            + Sync
            + 'static,
    {
        let invoke: Invoker =
            Box::new(move |behaviour, ctx, args| f(downcast::<B>(behaviour)?, ctx, args));
        let entry = MethodEntry {
            kind,
            params: params.into(),
            invoke,
        };
        self.table.methods.insert(name.to_string(), entry);
        self
    }

    pub fn command<F>(&mut self, name: &str, params: impl Into<Params>, f: F) -> &mut Self
    where
        F: Fn(&mut B, &mut CallContext, Args<'_>) -> Result<(), ArgumentError>
            + Send
            + Sync
            + 'static,
    {
        self.method(MethodKind::Command, name, params, f)
    }

    pub fn rpc<F>(&mut self, name: &str, params: impl Into<Params>, f: F) -> &mut Self
    where
        F: Fn(&mut B, &mut CallContext, Args<'_>) -> Result<(), ArgumentError>
            + Send
            + Sync
            + 'static,
    {
        self.method(MethodKind::Rpc, name, params, f)
    }

    pub fn target_rpc<F>(&mut self, name: &str, params: impl Into<Params>, f: F) -> &mut Self
    where
        F: Fn(&mut B, &mut CallContext, Args<'_>) -> Result<(), ArgumentError>
            + Send
            + Sync
            + 'static,
    {
        self.method(MethodKind::TargetRpc, name, params, f)
    }

    /// Registers a synced field through a mutable accessor.
    pub fn sync_var<V>(&mut self, name: &str, access: fn(&mut B) -> &mut V) -> &mut Self
    where
        V: FromValue + Into<Value> + Clone + 'static,
    {
        let get: Getter = Box::new(move |behaviour| {
            let target = downcast::<B>(behaviour)?;
            Ok(access(target).clone().into())
        });
        let set: Setter = Box::new(move |behaviour, value| {
            let next = V::from_value(value).ok_or(ArgumentError::TypeMismatch {
                index: 0,
                expected: V::KIND,
                actual: value.kind(),
            })?;
            *access(downcast::<B>(behaviour)?) = next;
            Ok(())
        });
        self.table
            .sync_vars
            .insert(name.to_string(), SyncVarEntry { get, set });
        self
    }
}

/// Registration tables for every behaviour type a session knows about.
pub struct BehaviourRegistry {
    tables: HashMap<TypeId, BehaviourTable>,
}

impl Default for BehaviourRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviourRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            tables: HashMap::new(),
        };
        registry.register::<NetworkIdentity>();
        registry
    }

    pub fn register<B: Behaviour>(&mut self) -> &mut Self {
        let mut table = BehaviourTable::new(type_name::<B>());
        B::register(&mut Registrar {
            table: &mut table,
            _marker: PhantomData,
        });
        self.tables.insert(TypeId::of::<B>(), table);
        self
    }

    pub fn is_registered<B: Behaviour>(&self) -> bool {
        self.tables.contains_key(&TypeId::of::<B>())
    }

    pub fn table_for(&self, behaviour: &dyn Behaviour) -> Result<&BehaviourTable> {
        self.tables.get(&behaviour.as_any().type_id()).ok_or_else(|| {
            ReplicationError::resolution(behaviour.name(), "behaviour type is not registered")
        })
    }

    /// Finds `name` on the behaviour's table and checks it against the frame
    /// category and the arguments it arrived with. A call that resolves here
    /// will not fail on argument access inside its invoker.
    pub fn resolve_method(
        &self,
        behaviour: &dyn Behaviour,
        name: &str,
        category: Category,
        args: &[Value],
    ) -> Result<&MethodEntry> {
        let table = self.table_for(behaviour)?;
        let entry = table.method(name).ok_or_else(|| {
            ReplicationError::resolution(name, format!("no such method on {}", behaviour.name()))
        })?;
        if entry.kind.category() != category {
            return Err(ReplicationError::resolution(
                name,
                format!("registered as {}, called as {category}", entry.kind.category()),
            ));
        }
        if !entry.params.accepts_count(args.len()) {
            return Err(ReplicationError::resolution(
                name,
                format!("expected {:?}, got {} arguments", entry.params, args.len()),
            ));
        }
        entry
            .params
            .check(args)
            .map_err(|e| ReplicationError::resolution(name, e.to_string()))?;
        Ok(entry)
    }

    pub fn resolve_sync_var(
        &self,
        behaviour: &dyn Behaviour,
        field: &str,
    ) -> Result<&SyncVarEntry> {
        self.table_for(behaviour)?.sync_var(field).ok_or_else(|| {
            ReplicationError::resolution(field, format!("no such sync var on {}", behaviour.name()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ComponentRef, EntityId};
    use crate::session::Role;

    #[derive(Default)]
    struct Counter {
        total: i32,
        label: String,
    }

    impl Behaviour for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn register(reg: &mut Registrar<'_, Self>) {
            reg.command("Add", [ValueKind::Int], |counter, _, args| {
                counter.total += args.get::<i32>(0)?;
                Ok(())
            })
            .method(
                MethodKind::Rpc,
                "Sum",
                Params::Variadic(ValueKind::Int),
                |counter, _, args| {
                    for index in 0..args.len() {
                        counter.total += args.get::<i32>(index)?;
                    }
                    Ok(())
                },
            )
            .sync_var("Total", |counter| &mut counter.total)
            .sync_var("Label", |counter| &mut counter.label);
        }
    }

    fn context() -> CallContext {
        CallContext::new(
            ComponentRef::new(EntityId::generate(), 0),
            None,
            Category::Command,
            Role::SERVER,
            true,
        )
    }

    fn registry() -> BehaviourRegistry {
        let mut registry = BehaviourRegistry::new();
        registry.register::<Counter>();
        registry
    }

    #[test]
    fn resolves_and_invokes_by_name() {
        let registry = registry();
        let mut counter = Counter::default();
        let mut ctx = context();

        let args = [Value::Int(4)];
        let entry = registry
            .resolve_method(&counter, "Add", Category::Command, &args)
            .unwrap();
        entry.invoke(&mut counter, &mut ctx, &args).unwrap();
        assert_eq!(counter.total, 4);
    }

    #[test]
    fn category_and_arity_must_match() {
        let registry = registry();
        let counter = Counter::default();

        let err = registry
            .resolve_method(&counter, "Add", Category::Rpc, &[Value::Int(1)])
            .err()
            .unwrap();
        assert!(matches!(err, ReplicationError::MethodResolutionFailure { .. }));

        assert!(registry
            .resolve_method(&counter, "Add", Category::Command, &[Value::Int(1), Value::Int(2)])
            .is_err());
        assert!(registry.resolve_method(&counter, "Missing", Category::Command, &[]).is_err());
    }

    #[test]
    fn variadic_accepts_any_count() {
        let registry = registry();
        let mut counter = Counter::default();
        let mut ctx = context();

        let args = [Value::Int(1), Value::Int(2), Value::Int(3)];
        let entry = registry.resolve_method(&counter, "Sum", Category::Rpc, &args).unwrap();
        entry.invoke(&mut counter, &mut ctx, &args).unwrap();
        assert_eq!(counter.total, 6);
        assert!(registry.resolve_method(&counter, "Sum", Category::Rpc, &[]).is_ok());
    }

    #[test]
    fn wrong_argument_type_fails_resolution() {
        let registry = registry();
        let counter = Counter::default();

        let err = registry
            .resolve_method(&counter, "Add", Category::Command, &[Value::from("five")])
            .err()
            .unwrap();
        assert_eq!(
            err,
            ReplicationError::resolution(
                "Add",
                ArgumentError::TypeMismatch {
                    index: 0,
                    expected: ValueKind::Int,
                    actual: ValueKind::String,
                }
                .to_string()
            )
        );
    }

    #[test]
    fn variadic_kinds_are_checked_before_any_argument_is_used() {
        let registry = registry();
        let counter = Counter::default();

        let err = registry
            .resolve_method(
                &counter,
                "Sum",
                Category::Rpc,
                &[Value::Int(1), Value::Float(2.0)],
            )
            .err()
            .unwrap();
        assert!(err.to_string().contains("argument 1"), "{err}");
    }

    #[test]
    fn params_check_reports_each_mismatch() {
        let params = Params::from([ValueKind::Int, ValueKind::String]);
        assert_eq!(params.check(&[Value::Int(1), Value::from("a")]), Ok(()));
        assert_eq!(params.check(&[Value::Int(1)]), Err(ArgumentError::Missing { index: 1 }));
        assert_eq!(
            params.check(&[Value::Int(1), Value::from("a"), Value::Int(2)]),
            Err(ArgumentError::Unexpected { index: 2 })
        );
        assert!(Params::none().check(&[]).is_ok());
        assert!(Params::Variadic(ValueKind::Vec3).check(&[]).is_ok());
    }

    #[test]
    fn sync_var_get_and_set() {
        let registry = registry();
        let mut counter = Counter::default();

        let total = registry.resolve_sync_var(&counter, "Total").unwrap();
        total.set(&mut counter, &Value::Int(9)).unwrap();
        assert_eq!(total.get(&mut counter).unwrap(), Value::Int(9));
        assert!(total.set(&mut counter, &Value::Float(1.0)).is_err());
        assert_eq!(counter.total, 9);

        let label = registry.resolve_sync_var(&counter, "Label").unwrap();
        label.set(&mut counter, &Value::from("red")).unwrap();
        assert_eq!(counter.label, "red");
    }

    #[test]
    fn unregistered_type_fails_resolution() {
        struct Stranger;
        impl Behaviour for Stranger {
            fn name(&self) -> &str {
                "Stranger"
            }
        }

        let registry = registry();
        assert!(registry.table_for(&Stranger).is_err());
        assert!(registry.is_registered::<NetworkIdentity>());
    }
}
