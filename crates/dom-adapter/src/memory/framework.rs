//! In-memory stand-in for the host page's component framework.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::DomError;
use crate::model::ComponentRef;
use crate::port::FrameworkPort;

type MethodFn = Arc<dyn Fn(&MemoryFramework, &[Value]) -> MethodResult + Send + Sync>;

/// Outcome of a scripted component method.
pub enum MethodResult {
    Value(Value),
    Object(Option<ComponentRef>),
    Error(String),
}

/// A scripted component: named children reachable through `lookup`,
/// properties and methods.
#[derive(Default)]
pub struct MemoryComponent {
    children: HashMap<String, ComponentRef>,
    properties: HashMap<String, Value>,
    methods: HashMap<String, MethodFn>,
}

impl MemoryComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: &str, value: Value) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&MemoryFramework, &[Value]) -> MethodResult + Send + Sync + 'static,
    {
        self.methods.insert(name.to_string(), Arc::new(f));
        self
    }

    /// Method returning a constant JSON value.
    pub fn returns(self, name: &str, value: Value) -> Self {
        self.method(name, move |_, _| MethodResult::Value(value.clone()))
    }
}

#[derive(Default)]
struct State {
    components: Vec<MemoryComponent>,
    platform: Option<ComponentRef>,
    applications: HashMap<String, ComponentRef>,
    active: Option<ComponentRef>,
    calls: Vec<(ComponentRef, String, Vec<Value>)>,
}

/// In-memory [`FrameworkPort`].
#[derive(Clone, Default)]
pub struct MemoryFramework {
    state: Arc<Mutex<State>>,
}

impl MemoryFramework {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, component: MemoryComponent) -> ComponentRef {
        let mut state = self.state.lock();
        let id = ComponentRef(state.components.len() as u64);
        state.components.push(component);
        id
    }

    /// Make `child` reachable via `parent.lookup(name)`.
    pub fn register(&self, parent: ComponentRef, name: &str, child: ComponentRef) {
        if let Some(p) = self.state.lock().components.get_mut(parent.0 as usize) {
            p.children.insert(name.to_string(), child);
        }
    }

    pub fn install_platform(&self, platform: ComponentRef) {
        self.state.lock().platform = Some(platform);
    }

    pub fn install_application(&self, app_id: &str, app: ComponentRef) {
        self.state
            .lock()
            .applications
            .insert(app_id.to_string(), app);
    }

    pub fn set_active_application(&self, app: ComponentRef) {
        self.state.lock().active = Some(app);
    }

    pub fn property_of(&self, target: ComponentRef, name: &str) -> Option<Value> {
        self.state
            .lock()
            .components
            .get(target.0 as usize)
            .and_then(|c| c.properties.get(name).cloned())
    }

    /// Method names invoked on `target`, in order.
    pub fn calls_to(&self, target: ComponentRef) -> Vec<(String, Vec<Value>)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(t, _, _)| *t == target)
            .map(|(_, m, a)| (m.clone(), a.clone()))
            .collect()
    }

    fn invoke(&self, target: ComponentRef, method: &str, args: Vec<Value>) -> Result<MethodResult, DomError> {
        let handler = {
            let mut state = self.state.lock();
            state.calls.push((target, method.to_string(), args.clone()));
            let component = state
                .components
                .get(target.0 as usize)
                .ok_or_else(|| DomError::component(format!("unknown component {}", target.0)))?;
            component.methods.get(method).cloned()
        };
        match handler {
            Some(handler) => Ok(handler(self, &args)),
            None => Err(DomError::component(format!("{method} is not a function"))),
        }
    }
}

#[async_trait]
impl FrameworkPort for MemoryFramework {
    async fn platform_available(&self) -> Result<bool, DomError> {
        Ok(self.state.lock().platform.is_some())
    }

    async fn platform(&self) -> Result<Option<ComponentRef>, DomError> {
        Ok(self.state.lock().platform)
    }

    async fn application(&self, app_id: &str) -> Result<Option<ComponentRef>, DomError> {
        Ok(self.state.lock().applications.get(app_id).copied())
    }

    async fn active_application(&self) -> Result<Option<ComponentRef>, DomError> {
        Ok(self.state.lock().active)
    }

    async fn lookup(&self, scope: ComponentRef, id: &str) -> Result<Option<ComponentRef>, DomError> {
        let state = self.state.lock();
        let component = state
            .components
            .get(scope.0 as usize)
            .ok_or_else(|| DomError::component(format!("unknown component {}", scope.0)))?;
        Ok(component.children.get(id).copied())
    }

    async fn call(
        &self,
        target: ComponentRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, DomError> {
        match self.invoke(target, method, args)? {
            MethodResult::Value(value) => Ok(value),
            MethodResult::Object(_) => Ok(Value::Null),
            MethodResult::Error(msg) => Err(DomError::component(msg)),
        }
    }

    async fn call_object(
        &self,
        target: ComponentRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Option<ComponentRef>, DomError> {
        match self.invoke(target, method, args)? {
            MethodResult::Object(object) => Ok(object),
            MethodResult::Value(_) => Ok(None),
            MethodResult::Error(msg) => Err(DomError::component(msg)),
        }
    }

    async fn has_method(&self, target: ComponentRef, method: &str) -> Result<bool, DomError> {
        Ok(self
            .state
            .lock()
            .components
            .get(target.0 as usize)
            .map(|c| method == "lookup" || c.methods.contains_key(method))
            .unwrap_or(false))
    }

    async fn set_property(
        &self,
        target: ComponentRef,
        name: &str,
        value: Value,
    ) -> Result<(), DomError> {
        let mut state = self.state.lock();
        state.calls.push((target, format!("={name}"), vec![value.clone()]));
        let component = state
            .components
            .get_mut(target.0 as usize)
            .ok_or_else(|| DomError::component(format!("unknown component {}", target.0)))?;
        component.properties.insert(name.to_string(), value);
        Ok(())
    }
}
