// src/models/catalog.rs

use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// ---
// Catálogo fixo: Módulo -> Submódulo -> Funcionalidade (+ Ações globais)
// ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Submodule {
    pub id: Uuid,
    pub module_id: Uuid,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: Uuid,
    pub submodule_id: Uuid,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub flags: Value,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: i16,
    pub key: String,
}

// Linha da listagem de funcionalidades (com as chaves dos ancestrais)
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeatureListing {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub submodule_id: Uuid,
    pub submodule_key: String,
    pub module_id: Uuid,
    pub module_key: String,
}

// ---
// Árvore montada em memória a partir das tabelas do catálogo
// ---

#[derive(Debug, Clone)]
pub struct SubmoduleNode {
    pub submodule: Submodule,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub module: Module,
    pub submodules: Vec<SubmoduleNode>,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogTree {
    pub modules: Vec<ModuleNode>,
    pub actions: Vec<Action>,
}

impl CatalogTree {
    /// Monta a árvore a partir das listas planas, já ordenadas por `sort_order`.
    /// Submódulos e funcionalidades órfãos são descartados.
    pub fn assemble(
        modules: Vec<Module>,
        submodules: Vec<Submodule>,
        features: Vec<Feature>,
        actions: Vec<Action>,
    ) -> Self {
        let mut tree: Vec<ModuleNode> = modules
            .into_iter()
            .map(|module| ModuleNode { module, submodules: Vec::new() })
            .collect();

        for submodule in submodules {
            if let Some(node) = tree.iter_mut().find(|m| m.module.id == submodule.module_id) {
                node.submodules.push(SubmoduleNode { submodule, features: Vec::new() });
            }
        }

        for feature in features {
            let parent = tree
                .iter_mut()
                .flat_map(|m| m.submodules.iter_mut())
                .find(|s| s.submodule.id == feature.submodule_id);
            if let Some(node) = parent {
                node.features.push(feature);
            }
        }

        Self { modules: tree, actions }
    }

    pub fn find_action(&self, key: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.key == key)
    }
}
