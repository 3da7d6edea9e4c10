use std::{collections::HashMap, sync::Arc};

use crate::requester::{FunctionSchema, ModelInfo, ProviderRequester};

/// Registered models, enabled functions, and the requester that serves them.
pub struct ProviderManager {
    requester: Arc<dyn ProviderRequester>,
    models: HashMap<String, ModelInfo>,
    functions: Vec<FunctionSchema>,
}

impl ProviderManager {
    pub fn new(requester: Arc<dyn ProviderRequester>) -> Self {
        Self {
            requester,
            models: HashMap::new(),
            functions: Vec::new(),
        }
    }

    pub fn register_model(&mut self, model: ModelInfo) {
        self.models.insert(model.name.clone(), model);
    }

    pub fn register_function(&mut self, function: FunctionSchema) {
        self.functions.push(function);
    }

    pub fn get_model(&self, name: &str) -> Option<ModelInfo> {
        self.models.get(name).cloned()
    }

    pub fn enabled_functions(&self) -> Vec<FunctionSchema> {
        self.functions.clone()
    }

    pub fn requester(&self) -> Arc<dyn ProviderRequester> {
        Arc::clone(&self.requester)
    }
}
