// src/services/resolver.rs

//! Resolvedor de permissões efetivas.
//!
//! Tudo aqui é puro: recebe o catálogo, os entitlements do restaurante, as
//! linhas de permissão dos cargos e os overrides do usuário já carregados, e
//! devolve decisões. Quem busca os dados no banco é o `PermissionService`.
//!
//! Ordem de avaliação de um par (funcionalidade, ação):
//! 1. superadmin libera tudo, sem olhar entitlements;
//! 2. funcionalidade, submódulo e módulo precisam estar `active`, senão bloqueia;
//! 3. dono do restaurante libera;
//! 4. override do usuário decide sozinho, se existir;
//! 5. união (OR) das linhas dos cargos do usuário;
//! 6. sem regra nenhuma, nega.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::{Action, CatalogTree},
        entitlement::{EntitlementStatus, EntityType},
        permission::{
            ActionView, DecisionReason, FeatureView, ModuleView, PermissionDecision,
            PermissionSnapshot, SubmoduleView,
        },
        rbac::PermissionRow,
    },
};

type GrantKey = (Uuid, i16);

/// Quem está pedindo acesso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_superadmin: bool,
    pub is_owner: bool,
}

/// Linhas dos cargos já dobradas com OR: um cargo que libera vence os que negam.
#[derive(Debug, Clone, Default)]
pub struct RoleGrants(HashMap<GrantKey, bool>);

impl RoleGrants {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = PermissionRow>,
    {
        let mut grants: HashMap<GrantKey, bool> = HashMap::new();
        for row in rows {
            let entry = grants.entry((row.feature_id, row.action_id)).or_insert(false);
            *entry |= row.allowed;
        }
        Self(grants)
    }

    pub fn get(&self, feature_id: Uuid, action_id: i16) -> Option<bool> {
        self.0.get(&(feature_id, action_id)).copied()
    }
}

/// Overrides do usuário: no máximo um valor por (funcionalidade, ação).
#[derive(Debug, Clone, Default)]
pub struct UserOverrides(HashMap<GrantKey, bool>);

impl UserOverrides {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = PermissionRow>,
    {
        Self(rows.into_iter().map(|r| ((r.feature_id, r.action_id), r.allowed)).collect())
    }

    pub fn get(&self, feature_id: Uuid, action_id: i16) -> Option<bool> {
        self.0.get(&(feature_id, action_id)).copied()
    }
}

/// Status de entitlement por nó do catálogo.
#[derive(Debug, Clone, Default)]
pub struct EntitlementMap(HashMap<(EntityType, Uuid), EntitlementStatus>);

impl EntitlementMap {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (EntityType, Uuid, EntitlementStatus)>,
    {
        Self(pairs.into_iter().map(|(t, id, s)| ((t, id), s)).collect())
    }

    pub fn status(&self, entity_type: EntityType, id: Uuid) -> Option<EntitlementStatus> {
        self.0.get(&(entity_type, id)).copied()
    }
}

/// Tudo que o resolvedor precisa para um (restaurante, usuário).
#[derive(Debug, Clone)]
pub struct PermissionInputs {
    pub restaurant_id: Uuid,
    pub principal: Principal,
    pub catalog: CatalogTree,
    pub entitlements: EntitlementMap,
    pub role_grants: RoleGrants,
    pub overrides: UserOverrides,
}

// Status dos três níveis (módulo, submódulo, funcionalidade) de um nó
#[derive(Debug, Clone, Copy)]
struct Lineage {
    module: Option<EntitlementStatus>,
    submodule: Option<EntitlementStatus>,
    feature: Option<EntitlementStatus>,
}

impl Lineage {
    fn is_active(&self) -> bool {
        EntitlementStatus::grants_access(self.module)
            && EntitlementStatus::grants_access(self.submodule)
            && EntitlementStatus::grants_access(self.feature)
    }
}

fn decide(
    principal: &Principal,
    lineage: Lineage,
    role_grant: Option<bool>,
    override_value: Option<bool>,
) -> PermissionDecision {
    if principal.is_superadmin {
        return PermissionDecision::allow(DecisionReason::Superadmin);
    }
    if !lineage.is_active() {
        return PermissionDecision::locked();
    }
    if principal.is_owner {
        return PermissionDecision::allow(DecisionReason::Owner);
    }
    match (override_value, role_grant) {
        (Some(true), _) => PermissionDecision::allow(DecisionReason::OverrideAllow),
        (Some(false), _) => PermissionDecision::deny(DecisionReason::OverrideDeny),
        (None, Some(true)) => PermissionDecision::allow(DecisionReason::RoleAllow),
        (None, Some(false)) => PermissionDecision::deny(DecisionReason::RoleDeny),
        (None, None) => PermissionDecision::deny(DecisionReason::DefaultDeny),
    }
}

impl PermissionInputs {
    /// Decide um único par pelas chaves do catálogo.
    pub fn resolve(&self, feature_key: &str, action_key: &str) -> Result<PermissionDecision, AppError> {
        let (module, submodule, feature) = self
            .catalog
            .modules
            .iter()
            .flat_map(|m| m.submodules.iter().map(move |s| (m, s)))
            .flat_map(|(m, s)| s.features.iter().map(move |f| (m, s, f)))
            .find(|(_, _, f)| f.key == feature_key)
            .ok_or_else(|| AppError::UnknownFeature(feature_key.to_string()))?;

        let action = self
            .catalog
            .find_action(action_key)
            .ok_or_else(|| AppError::UnknownAction(action_key.to_string()))?;

        let lineage = Lineage {
            module: self.entitlements.status(EntityType::Module, module.module.id),
            submodule: self.entitlements.status(EntityType::Submodule, submodule.submodule.id),
            feature: self.entitlements.status(EntityType::Feature, feature.id),
        };

        Ok(self.decide_pair(lineage, feature.id, action))
    }

    fn decide_pair(&self, lineage: Lineage, feature_id: Uuid, action: &Action) -> PermissionDecision {
        decide(
            &self.principal,
            lineage,
            self.role_grants.get(feature_id, action.id),
            self.overrides.get(feature_id, action.id),
        )
    }
}

/// Avalia todos os pares do catálogo e monta a árvore do snapshot.
/// Nós `hidden` continuam na árvore, só marcados.
pub fn build_snapshot(inputs: &PermissionInputs, perm_version: i32) -> PermissionSnapshot {
    let ents = &inputs.entitlements;

    let modules = inputs
        .catalog
        .modules
        .iter()
        .map(|module_node| {
            let module = &module_node.module;
            let module_status = ents.status(EntityType::Module, module.id);
            let module_locked = !EntitlementStatus::grants_access(module_status);
            let module_hidden = EntitlementStatus::is_hidden(module_status);

            let submodules = module_node
                .submodules
                .iter()
                .map(|sub_node| {
                    let sub = &sub_node.submodule;
                    let sub_status = ents.status(EntityType::Submodule, sub.id);
                    let sub_locked = module_locked || !EntitlementStatus::grants_access(sub_status);
                    let sub_hidden = module_hidden || EntitlementStatus::is_hidden(sub_status);

                    let features = sub_node
                        .features
                        .iter()
                        .map(|feature| {
                            let feature_status = ents.status(EntityType::Feature, feature.id);
                            let lineage = Lineage {
                                module: module_status,
                                submodule: sub_status,
                                feature: feature_status,
                            };

                            let actions = inputs
                                .catalog
                                .actions
                                .iter()
                                .map(|action| {
                                    let decision = inputs.decide_pair(lineage, feature.id, action);
                                    ActionView {
                                        id: action.id,
                                        key: action.key.clone(),
                                        allowed: decision.allowed,
                                        locked: decision.locked,
                                        reason: decision.reason,
                                    }
                                })
                                .collect();

                            FeatureView {
                                id: feature.id,
                                key: feature.key.clone(),
                                name: feature.name.clone(),
                                status: feature_status,
                                locked: sub_locked || !EntitlementStatus::grants_access(feature_status),
                                hidden: sub_hidden || EntitlementStatus::is_hidden(feature_status),
                                actions,
                            }
                        })
                        .collect();

                    SubmoduleView {
                        id: sub.id,
                        key: sub.key.clone(),
                        name: sub.name.clone(),
                        status: sub_status,
                        locked: sub_locked,
                        hidden: sub_hidden,
                        features,
                    }
                })
                .collect();

            ModuleView {
                id: module.id,
                key: module.key.clone(),
                name: module.name.clone(),
                status: module_status,
                locked: module_locked,
                hidden: module_hidden,
                submodules,
            }
        })
        .collect();

    PermissionSnapshot {
        restaurant_id: inputs.restaurant_id,
        user_id: inputs.principal.user_id,
        perm_version,
        is_superadmin: inputs.principal.is_superadmin,
        is_owner: inputs.principal.is_owner,
        modules,
    }
}

impl PermissionSnapshot {
    pub fn find_feature(&self, feature_key: &str) -> Option<&FeatureView> {
        self.modules
            .iter()
            .flat_map(|m| m.submodules.iter())
            .flat_map(|s| s.features.iter())
            .find(|f| f.key == feature_key)
    }

    /// Responde um único par a partir da árvore já resolvida.
    pub fn check(&self, feature_key: &str, action_key: &str) -> Result<PermissionDecision, AppError> {
        let feature = self
            .find_feature(feature_key)
            .ok_or_else(|| AppError::UnknownFeature(feature_key.to_string()))?;

        let action = feature
            .actions
            .iter()
            .find(|a| a.key == action_key)
            .ok_or_else(|| AppError::UnknownAction(action_key.to_string()))?;

        Ok(PermissionDecision {
            allowed: action.allowed,
            locked: action.locked,
            reason: action.reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::{Feature, Module, Submodule};
    use serde_json::json;

    struct Fixture {
        catalog: CatalogTree,
        module_id: Uuid,
        submodule_id: Uuid,
        categories_id: Uuid,
        addons_id: Uuid,
    }

    const CREATE: i16 = 1;
    const READ: i16 = 2;

    fn fixture() -> Fixture {
        let module_id = Uuid::new_v4();
        let submodule_id = Uuid::new_v4();
        let categories_id = Uuid::new_v4();
        let addons_id = Uuid::new_v4();

        let modules = vec![Module {
            id: module_id,
            key: "erp".into(),
            name: "ERP".into(),
            description: None,
            visible: true,
            sort_order: 0,
        }];
        let submodules = vec![Submodule {
            id: submodule_id,
            module_id,
            key: "menu".into(),
            name: "Cardápio".into(),
            description: None,
            sort_order: 0,
        }];
        let feature = |id: Uuid, key: &str| Feature {
            id,
            submodule_id,
            key: key.into(),
            name: key.into(),
            description: None,
            sort_order: 0,
            flags: json!({}),
        };
        let features = vec![
            feature(categories_id, "erp:menu:categories"),
            feature(addons_id, "erp:menu:addons"),
        ];
        let actions = vec![
            Action { id: CREATE, key: "create".into() },
            Action { id: READ, key: "read".into() },
        ];

        Fixture {
            catalog: CatalogTree::assemble(modules, submodules, features, actions),
            module_id,
            submodule_id,
            categories_id,
            addons_id,
        }
    }

    fn member() -> Principal {
        Principal { user_id: Uuid::new_v4(), is_superadmin: false, is_owner: false }
    }

    fn all_active(fx: &Fixture) -> EntitlementMap {
        EntitlementMap::from_pairs([
            (EntityType::Module, fx.module_id, EntitlementStatus::Active),
            (EntityType::Submodule, fx.submodule_id, EntitlementStatus::Active),
            (EntityType::Feature, fx.categories_id, EntitlementStatus::Active),
            (EntityType::Feature, fx.addons_id, EntitlementStatus::Active),
        ])
    }

    fn row(feature_id: Uuid, action_id: i16, allowed: bool) -> PermissionRow {
        PermissionRow { feature_id, action_id, allowed }
    }

    fn inputs(fx: &Fixture, principal: Principal, entitlements: EntitlementMap) -> PermissionInputs {
        PermissionInputs {
            restaurant_id: Uuid::new_v4(),
            principal,
            catalog: fx.catalog.clone(),
            entitlements,
            role_grants: RoleGrants::default(),
            overrides: UserOverrides::default(),
        }
    }

    #[test]
    fn role_grant_allows_when_entitled() {
        let fx = fixture();
        let mut i = inputs(&fx, member(), all_active(&fx));
        i.role_grants = RoleGrants::from_rows([row(fx.categories_id, READ, true)]);

        let decision = i.resolve("erp:menu:categories", "read").unwrap();
        assert_eq!(decision, PermissionDecision::allow(DecisionReason::RoleAllow));

        // Outra ação da mesma funcionalidade continua negada
        let decision = i.resolve("erp:menu:categories", "create").unwrap();
        assert_eq!(decision, PermissionDecision::deny(DecisionReason::DefaultDeny));
    }

    #[test]
    fn any_allowing_role_wins_over_denying_roles() {
        let fx = fixture();
        let mut i = inputs(&fx, member(), all_active(&fx));
        i.role_grants = RoleGrants::from_rows([
            row(fx.categories_id, READ, false),
            row(fx.categories_id, READ, true),
            row(fx.categories_id, READ, false),
        ]);
        assert!(i.resolve("erp:menu:categories", "read").unwrap().allowed);
    }

    #[test]
    fn role_rows_that_all_deny_report_role_deny() {
        let fx = fixture();
        let mut i = inputs(&fx, member(), all_active(&fx));
        i.role_grants = RoleGrants::from_rows([row(fx.addons_id, CREATE, false)]);
        let decision = i.resolve("erp:menu:addons", "create").unwrap();
        assert_eq!(decision, PermissionDecision::deny(DecisionReason::RoleDeny));
    }

    #[test]
    fn override_beats_roles_in_both_directions() {
        let fx = fixture();
        let mut i = inputs(&fx, member(), all_active(&fx));
        i.role_grants = RoleGrants::from_rows([
            row(fx.categories_id, READ, true),
            row(fx.addons_id, READ, false),
        ]);
        i.overrides = UserOverrides::from_rows([
            row(fx.categories_id, READ, false),
            row(fx.addons_id, READ, true),
        ]);

        let denied = i.resolve("erp:menu:categories", "read").unwrap();
        assert_eq!(denied, PermissionDecision::deny(DecisionReason::OverrideDeny));

        let allowed = i.resolve("erp:menu:addons", "read").unwrap();
        assert_eq!(allowed, PermissionDecision::allow(DecisionReason::OverrideAllow));
    }

    #[test]
    fn locked_or_missing_entitlement_blocks_even_with_override() {
        let fx = fixture();
        let entitlements = EntitlementMap::from_pairs([
            (EntityType::Module, fx.module_id, EntitlementStatus::Active),
            (EntityType::Submodule, fx.submodule_id, EntitlementStatus::Active),
            (EntityType::Feature, fx.categories_id, EntitlementStatus::Locked),
            // addons sem linha nenhuma
        ]);
        let mut i = inputs(&fx, member(), entitlements);
        i.overrides = UserOverrides::from_rows([
            row(fx.categories_id, READ, true),
            row(fx.addons_id, READ, true),
        ]);

        assert_eq!(i.resolve("erp:menu:categories", "read").unwrap(), PermissionDecision::locked());
        assert_eq!(i.resolve("erp:menu:addons", "read").unwrap(), PermissionDecision::locked());
    }

    #[test]
    fn inactive_ancestor_locks_every_feature_below() {
        let fx = fixture();
        for status in [EntitlementStatus::Locked, EntitlementStatus::Hidden, EntitlementStatus::Trial] {
            let entitlements = EntitlementMap::from_pairs([
                (EntityType::Module, fx.module_id, status),
                (EntityType::Submodule, fx.submodule_id, EntitlementStatus::Active),
                (EntityType::Feature, fx.categories_id, EntitlementStatus::Active),
            ]);
            let mut i = inputs(&fx, member(), entitlements);
            i.role_grants = RoleGrants::from_rows([row(fx.categories_id, READ, true)]);
            let decision = i.resolve("erp:menu:categories", "read").unwrap();
            assert!(decision.locked, "status {:?} deveria bloquear", status);
            assert!(!decision.allowed);
        }
    }

    #[test]
    fn superadmin_bypasses_entitlements() {
        let fx = fixture();
        let principal = Principal { is_superadmin: true, ..member() };
        let i = inputs(&fx, principal, EntitlementMap::default());
        let decision = i.resolve("erp:menu:addons", "create").unwrap();
        assert_eq!(decision, PermissionDecision::allow(DecisionReason::Superadmin));
    }

    #[test]
    fn owner_needs_entitlement_but_not_roles() {
        let fx = fixture();
        let owner = Principal { is_owner: true, ..member() };

        let entitled = inputs(&fx, owner, all_active(&fx));
        assert_eq!(
            entitled.resolve("erp:menu:addons", "create").unwrap(),
            PermissionDecision::allow(DecisionReason::Owner)
        );

        let not_entitled = inputs(&fx, owner, EntitlementMap::default());
        assert!(not_entitled.resolve("erp:menu:addons", "create").unwrap().locked);
    }

    #[test]
    fn unknown_keys_are_typed_errors() {
        let fx = fixture();
        let i = inputs(&fx, member(), all_active(&fx));
        assert!(matches!(
            i.resolve("erp:menu:nope", "read"),
            Err(AppError::UnknownFeature(key)) if key == "erp:menu:nope"
        ));
        assert!(matches!(
            i.resolve("erp:menu:addons", "approve"),
            Err(AppError::UnknownAction(key)) if key == "approve"
        ));
    }

    #[test]
    fn snapshot_matches_single_resolution() {
        let fx = fixture();
        let mut i = inputs(&fx, member(), all_active(&fx));
        i.role_grants = RoleGrants::from_rows([
            row(fx.categories_id, READ, true),
            row(fx.addons_id, CREATE, false),
        ]);
        i.overrides = UserOverrides::from_rows([row(fx.addons_id, READ, true)]);

        let snapshot = build_snapshot(&i, 7);
        assert_eq!(snapshot.perm_version, 7);
        for feature in ["erp:menu:categories", "erp:menu:addons"] {
            for action in ["create", "read"] {
                assert_eq!(
                    snapshot.check(feature, action).unwrap(),
                    i.resolve(feature, action).unwrap(),
                    "{} / {}",
                    feature,
                    action
                );
            }
        }
        assert!(matches!(snapshot.check("x:y:z", "read"), Err(AppError::UnknownFeature(_))));
        assert!(matches!(
            snapshot.check("erp:menu:addons", "export"),
            Err(AppError::UnknownAction(_))
        ));
    }

    #[test]
    fn snapshot_flags_cascade_from_ancestors() {
        let fx = fixture();
        let entitlements = EntitlementMap::from_pairs([
            (EntityType::Module, fx.module_id, EntitlementStatus::Active),
            (EntityType::Submodule, fx.submodule_id, EntitlementStatus::Hidden),
            (EntityType::Feature, fx.categories_id, EntitlementStatus::Active),
        ]);
        let snapshot = build_snapshot(&inputs(&fx, member(), entitlements), 1);

        let module = &snapshot.modules[0];
        assert!(!module.locked);
        assert!(!module.hidden);

        let sub = &module.submodules[0];
        assert_eq!(sub.status, Some(EntitlementStatus::Hidden));
        assert!(sub.locked);
        assert!(sub.hidden);

        let categories = snapshot.find_feature("erp:menu:categories").unwrap();
        assert_eq!(categories.status, Some(EntitlementStatus::Active));
        assert!(categories.locked);
        assert!(categories.hidden);
        assert!(categories.actions.iter().all(|a| a.locked && !a.allowed));

        let addons = snapshot.find_feature("erp:menu:addons").unwrap();
        assert_eq!(addons.status, None);
        assert_eq!(addons.actions.len(), 2);
    }
}
