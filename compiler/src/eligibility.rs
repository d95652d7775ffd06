// eligibility.rs — Eligibility Validator
//
// Decides whether a reflected signature can back each intent node family and
// resolves the opt-in metadata tags into typed plans once, so expansion never
// looks at tag strings. Also answers discovery queries.
//
// Preconditions: the registry is linked.
// Postconditions: every `Ok` plan references functions and parameters that exist.
// Failure modes: ineligible signatures → `Ineligible` with a readable reason.
// Side effects: none (the plan cache is owned by the caller).

use std::collections::HashMap;

use serde::Serialize;

use crate::diag::{codes, DiagCode, Diagnostic};
use crate::id::NodeId;
use crate::registry::{tags, FunctionRef, Param, Registry, Signature, ACTOR_CLASS};
use crate::schema::{self, names};
use crate::types::TypeKind;

/// Why a signature cannot back a node. Soft: excluded from discovery only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct Ineligible {
    pub reason: String,
}

fn ineligible<T>(reason: impl Into<String>) -> Result<T, Ineligible> {
    Err(Ineligible {
        reason: reason.into(),
    })
}

/// Failure to resolve the function an intent node is bound to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpandError {
    #[error("unknown function '{0}'")]
    UnknownFunction(FunctionRef),
    #[error("'{function}' cannot back this node: {reason}")]
    Ineligible { function: FunctionRef, reason: String },
    #[error("unknown delegate '{0}'")]
    UnknownDelegate(String),
    #[error("unknown enum '{0}'")]
    UnknownEnum(String),
    #[error("node {0} does not exist")]
    MissingNode(NodeId),
}

impl ExpandError {
    pub fn code(&self) -> DiagCode {
        match self {
            ExpandError::Ineligible { .. } => codes::E0104,
            _ => codes::E0100,
        }
    }

    pub fn to_diagnostic(&self, node: NodeId) -> Diagnostic {
        Diagnostic::error(node, self.to_string()).with_code(self.code())
    }
}

// ── Delegate inlining ───────────────────────────────────────────────────────

/// A callback with no return value and no true outputs can become an inline
/// continuation. Reference parameters that are also inputs are allowed.
pub fn is_delegate_eligible(callback: &Signature) -> bool {
    let has_return = callback.params.iter().any(|p| p.flags.is_return);
    let has_out = callback
        .params
        .iter()
        .any(|p| p.flags.is_output && !p.is_ref_input());
    !has_return && !has_out
}

fn inlinable_callback(param: &Param) -> Option<&Signature> {
    if !param.is_input() {
        return None;
    }
    param
        .callback
        .as_deref()
        .filter(|cb| is_delegate_eligible(cb))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackPlan {
    /// Callback parameter on the bound function.
    pub param: String,
    pub delegate: String,
    /// Input parameters of the callback, in declaration order.
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegatePlan {
    pub function: FunctionRef,
    pub callbacks: Vec<CallbackPlan>,
}

impl DelegatePlan {
    pub fn callback(&self, param: &str) -> Option<&CallbackPlan> {
        self.callbacks.iter().find(|c| c.param == param)
    }
}

pub fn delegate_plan(sig: &Signature) -> Result<DelegatePlan, Ineligible> {
    if !sig.metadata.has(tags::NEAT_DELEGATE_FUNCTION) {
        return ineligible(format!("not tagged {}", tags::NEAT_DELEGATE_FUNCTION));
    }
    let callbacks: Vec<CallbackPlan> = sig
        .params
        .iter()
        .filter_map(|p| {
            inlinable_callback(p).map(|cb| CallbackPlan {
                param: p.name.clone(),
                delegate: cb.name.clone(),
                inputs: cb
                    .params
                    .iter()
                    .filter(|q| q.is_input())
                    .map(|q| q.name.clone())
                    .collect(),
            })
        })
        .collect();
    if callbacks.is_empty() {
        let any_callback = sig.params.iter().any(|p| p.callback.is_some());
        return ineligible(if any_callback {
            "every callback parameter returns a value or has output parameters"
        } else {
            "no callback parameters"
        });
    }
    Ok(DelegatePlan {
        function: sig.key(),
        callbacks,
    })
}

// ── Construct-configure-finish ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinishPlan {
    pub function: FunctionRef,
    /// Finish input that receives the constructed object.
    pub object_input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructPlan {
    pub function: FunctionRef,
    /// Metaclass captured by the `Class` parameter.
    pub meta_class: String,
    pub requires_validation: bool,
    /// Properties never exposed as configuration pins.
    pub hidden_properties: Vec<String>,
    pub finish: Option<FinishPlan>,
}

impl ConstructPlan {
    /// Parameters consumed by the construct or finish calls; never assigned
    /// as properties.
    pub fn call_params<'r>(&self, registry: &'r Registry) -> Vec<&'r str> {
        let mut out = Vec::new();
        for f in std::iter::once(&self.function).chain(self.finish.iter().map(|f| &f.function)) {
            if let Some(sig) = registry.function(f) {
                out.extend(sig.params.iter().map(|p| p.name.as_str()));
            }
        }
        out
    }
}

/// Check a construct signature and resolve its finish step.
///
/// `default_finish` enables the prelude finish for Actor-derived targets when
/// the signature names none.
pub fn construct_plan(
    registry: &Registry,
    sig: &Signature,
    default_finish: bool,
) -> Result<ConstructPlan, Ineligible> {
    if !sig.metadata.has(tags::NEAT_CONSTRUCTOR) {
        return ineligible(format!("not tagged {}", tags::NEAT_CONSTRUCTOR));
    }
    let meta_class = match sig.find_param(names::CLASS) {
        Some(p) if p.is_input() && !p.ty.is_container() => match &p.ty.kind {
            TypeKind::Class(c) => c.clone(),
            _ => return ineligible(format!("'{}' is not a class reference", names::CLASS)),
        },
        _ => return ineligible(format!("no '{}' input parameter", names::CLASS)),
    };
    let Some(ret) = sig.return_param() else {
        return ineligible("no return value");
    };
    let instance = crate::types::PinType::object(&meta_class);
    if !schema::is_assignable(registry, &instance, &ret.ty) {
        return ineligible(format!(
            "return type {} cannot hold an instance of {}",
            ret.ty, meta_class
        ));
    }

    let finish_ref = match sig.metadata.get(tags::NEAT_CONSTRUCTOR_FINISH) {
        Some(name) if name.contains('.') => Some(name.parse::<FunctionRef>().map_err(|e| Ineligible { reason: e })?),
        Some(name) => Some(FunctionRef::new(&sig.owner, name)),
        None if default_finish && registry.is_child_of(&meta_class, ACTOR_CLASS) => {
            let f = crate::registry::prelude::default_finish();
            registry.function(&f).map(|_| f)
        }
        None => None,
    };
    let finish = match finish_ref {
        Some(f) => {
            let Some(finish_sig) = registry.function(&f) else {
                return ineligible(format!("finish function '{f}' does not exist"));
            };
            let object_input = finish_sig
                .inputs()
                .find(|p| !p.ty.is_wildcard() && schema::is_assignable(registry, &ret.ty, &p.ty))
                .map(|p| p.name.clone());
            match object_input {
                Some(object_input) => Some(FinishPlan {
                    function: finish_sig.key(),
                    object_input,
                }),
                None => {
                    return ineligible(format!(
                        "finish function '{f}' has no input accepting {}",
                        ret.ty
                    ))
                }
            }
        }
        None => None,
    };

    Ok(ConstructPlan {
        function: sig.key(),
        meta_class,
        requires_validation: sig.metadata.has(tags::REQUIRES_VALIDATION),
        hidden_properties: sig.metadata.list(tags::HIDE_SPAWN_PARMS),
        finish,
    })
}

// ── Session-scoped cache ────────────────────────────────────────────────────

/// Plans resolved during one compilation session, keyed by function.
#[derive(Debug, Default)]
pub struct PlanCache {
    default_finish: bool,
    delegates: HashMap<FunctionRef, Result<DelegatePlan, Ineligible>>,
    constructs: HashMap<FunctionRef, Result<ConstructPlan, Ineligible>>,
}

impl PlanCache {
    pub fn new(default_finish: bool) -> Self {
        PlanCache {
            default_finish,
            ..Default::default()
        }
    }

    pub fn delegate(&mut self, registry: &Registry, function: &FunctionRef) -> Result<DelegatePlan, ExpandError> {
        let sig = registry
            .function(function)
            .ok_or_else(|| ExpandError::UnknownFunction(function.clone()))?;
        self.delegates
            .entry(function.clone())
            .or_insert_with(|| delegate_plan(sig))
            .clone()
            .map_err(|e| ExpandError::Ineligible {
                function: function.clone(),
                reason: e.reason,
            })
    }

    pub fn construct(&mut self, registry: &Registry, function: &FunctionRef) -> Result<ConstructPlan, ExpandError> {
        let sig = registry
            .function(function)
            .ok_or_else(|| ExpandError::UnknownFunction(function.clone()))?;
        let default_finish = self.default_finish;
        self.constructs
            .entry(function.clone())
            .or_insert_with(|| construct_plan(registry, sig, default_finish))
            .clone()
            .map_err(|e| ExpandError::Ineligible {
                function: function.clone(),
                reason: e.reason,
            })
    }

    pub fn len(&self) -> usize {
        self.delegates.len() + self.constructs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Discovery ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFamily {
    DelegateCall,
    Construct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub family: NodeFamily,
    pub function: FunctionRef,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Every tagged signature of `family` with its eligibility, sorted by
/// function reference.
pub fn enumerate(registry: &Registry, family: NodeFamily, default_finish: bool) -> Vec<CatalogEntry> {
    let tag = match family {
        NodeFamily::DelegateCall => tags::NEAT_DELEGATE_FUNCTION,
        NodeFamily::Construct => tags::NEAT_CONSTRUCTOR,
    };
    let mut entries: Vec<CatalogEntry> = registry
        .functions()
        .filter(|sig| sig.metadata.has(tag))
        .map(|sig| {
            let verdict = match family {
                NodeFamily::DelegateCall => delegate_plan(sig).map(|_| ()),
                NodeFamily::Construct => construct_plan(registry, sig, default_finish).map(|_| ()),
            };
            CatalogEntry {
                family,
                function: sig.key(),
                eligible: verdict.is_ok(),
                reason: verdict.err().map(|e| e.reason),
            }
        })
        .collect();
    entries.sort_by(|a, b| a.function.cmp(&b.function));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIB: &str = r#"
        delegate OnDone(Asset: object<Object>, Path: string);
        delegate OnQuery(Key: string, out Answer: int);
        delegate OnAsk(Key: string) -> bool;
        delegate OnPatch(ref Data: array<int>, Count: int);
        class Thing : Actor { }
        class Widget : Object { }
        library Lib {
            #[NeatDelegateFunction]
            fn Load(Path: string, Done: delegate<OnDone>, Query: delegate<OnQuery>, Patch: delegate<OnPatch>);
            #[NeatDelegateFunction]
            fn OnlyBad(Ask: delegate<OnAsk>);
            fn Untagged(Done: delegate<OnDone>);

            #[NeatConstructor, NeatConstructorFinish = "Finish", RequiresValidation, HideSpawnParms = "A,B"]
            fn Spawn(Class: class<Thing>) -> object<Thing>;
            fn Finish(Owner: object<Widget>, Target: object<Actor>);
            fn FinishActor(Target: object<Actor>, Delay: real);
            #[NeatConstructor]
            fn SpawnActor(Class: class<Thing>) -> object<Actor>;
            #[NeatConstructor]
            fn MakeWidget(Class: class<Widget>) -> object<Widget>;
            #[NeatConstructor]
            fn WrongReturn(Class: class<Actor>) -> object<Thing>;
            #[NeatConstructor, NeatConstructorFinish = "FinishActor"]
            fn NoFinishInput(Class: class<Widget>) -> object<Widget>;
            #[NeatConstructor]
            fn NoClass(Kind: int) -> object<Thing>;
        }
    "#;

    fn reg() -> Registry {
        Registry::from_source(LIB).unwrap()
    }

    fn sig<'r>(r: &'r Registry, name: &str) -> &'r Signature {
        r.function(&FunctionRef::new("Lib", name)).unwrap()
    }

    #[test]
    fn delegate_eligibility_rules() {
        let r = reg();
        assert!(is_delegate_eligible(r.delegate("OnDone").unwrap()));
        assert!(!is_delegate_eligible(r.delegate("OnQuery").unwrap()));
        assert!(!is_delegate_eligible(r.delegate("OnAsk").unwrap()));
        // Reference inputs are not outputs.
        assert!(is_delegate_eligible(r.delegate("OnPatch").unwrap()));
    }

    #[test]
    fn delegate_plan_keeps_only_eligible_callbacks() {
        let r = reg();
        let plan = delegate_plan(sig(&r, "Load")).unwrap();
        let params: Vec<_> = plan.callbacks.iter().map(|c| c.param.as_str()).collect();
        assert_eq!(params, vec!["Done", "Patch"]);
        assert_eq!(plan.callback("Done").unwrap().inputs, vec!["Asset", "Path"]);
        assert_eq!(plan.callback("Patch").unwrap().inputs, vec!["Data", "Count"]);
    }

    #[test]
    fn delegate_plan_rejections() {
        let r = reg();
        assert!(delegate_plan(sig(&r, "OnlyBad")).is_err());
        let err = delegate_plan(sig(&r, "Untagged")).unwrap_err();
        assert!(err.reason.contains("NeatDelegateFunction"));
    }

    #[test]
    fn construct_plan_resolves_finish_and_tags() {
        let r = reg();
        let plan = construct_plan(&r, sig(&r, "Spawn"), true).unwrap();
        assert_eq!(plan.meta_class, "Thing");
        assert!(plan.requires_validation);
        assert_eq!(plan.hidden_properties, vec!["A", "B"]);
        let finish = plan.finish.unwrap();
        assert_eq!(finish.function, FunctionRef::new("Lib", "Finish"));
        assert_eq!(finish.object_input, "Target");
    }

    #[test]
    fn actor_targets_get_default_finish() {
        let r = reg();
        let plan = construct_plan(&r, sig(&r, "SpawnActor"), true).unwrap();
        assert_eq!(
            plan.finish.unwrap().function,
            crate::registry::prelude::default_finish()
        );
        let plan = construct_plan(&r, sig(&r, "SpawnActor"), false).unwrap();
        assert!(plan.finish.is_none());
        let plan = construct_plan(&r, sig(&r, "MakeWidget"), true).unwrap();
        assert!(plan.finish.is_none());
    }

    #[test]
    fn construct_rejections_have_reasons() {
        let r = reg();
        let err = construct_plan(&r, sig(&r, "WrongReturn"), true).unwrap_err();
        assert!(err.reason.contains("cannot hold"), "{}", err.reason);
        let err = construct_plan(&r, sig(&r, "NoFinishInput"), true).unwrap_err();
        assert!(err.reason.contains("no input accepting"), "{}", err.reason);
        let err = construct_plan(&r, sig(&r, "NoClass"), true).unwrap_err();
        assert!(err.reason.contains("'Class'"), "{}", err.reason);
    }

    #[test]
    fn cache_reports_unknown_and_ineligible() {
        let r = reg();
        let mut cache = PlanCache::new(true);
        let err = cache
            .construct(&r, &FunctionRef::new("Lib", "Nope"))
            .unwrap_err();
        assert_eq!(err.code(), codes::E0100);
        let err = cache
            .construct(&r, &FunctionRef::new("Lib", "NoClass"))
            .unwrap_err();
        assert_eq!(err.code(), codes::E0104);
        assert!(cache.delegate(&r, &FunctionRef::new("Lib", "Load")).is_ok());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn enumerate_sorts_and_explains() {
        let r = reg();
        let entries = enumerate(&r, NodeFamily::Construct, true);
        let names: Vec<_> = entries.iter().map(|e| e.function.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["MakeWidget", "NoClass", "NoFinishInput", "Spawn", "SpawnActor", "WrongReturn"]
        );
        assert!(entries[0].eligible && entries[0].reason.is_none());
        assert!(!entries[1].eligible && entries[1].reason.is_some());

        let entries = enumerate(&r, NodeFamily::DelegateCall, true);
        let names: Vec<_> = entries.iter().map(|e| e.function.name.as_str()).collect();
        assert_eq!(names, vec!["Load", "OnlyBad"]);
    }
}
