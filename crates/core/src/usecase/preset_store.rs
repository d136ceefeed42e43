use crate::domain::config::PathConfig;
use crate::domain::error::AppError;
use crate::domain::preset::{
    builtin_presets, default_presets, is_default_preset, validate_preset_name, Preset, PresetMap,
};
use crate::domain::types::Segment;
use crate::infra::storage::GlobalPresetRepo;

/// 保存結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// 一括削除の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDelete {
    pub removed: Vec<String>,
    /// 組み込みのため削除しなかった名前
    pub protected: Vec<String>,
}

/// 組み込み < グローバル < ドキュメントの順に上書きマージする
pub fn merge_presets(defaults: &PresetMap, global: &PresetMap, local: &PresetMap) -> PresetMap {
    let mut merged = defaults.clone();
    merged.extend(global.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// `incoming` のうち未知の名前だけを追加し、追加した名前を返す。
/// ローカルにしかないプリセットは消さない。
pub fn absorb_new(presets: &mut PresetMap, incoming: PresetMap) -> Vec<String> {
    let mut added = Vec::new();
    for (name, preset) in incoming {
        if !presets.contains_key(&name) {
            presets.insert(name.clone(), preset);
            added.push(name);
        }
    }
    if !added.is_empty() {
        log::info!("グローバルプリセットを {} 件取り込みました", added.len());
    }
    added
}

/// プリセットの CRUD
///
/// 対象のマップ（ウィジェットが持つ統合済みマップ）は呼び出し側が渡す。
/// グローバルストアへの書き込みが失敗した場合、マップは変更しない。
#[derive(Clone)]
pub struct PresetStore {
    global: GlobalPresetRepo,
}

impl PresetStore {
    pub fn new(global: GlobalPresetRepo) -> Self {
        Self { global }
    }

    /// ウィジェット生成時の統合マップ
    pub fn merged(&self, local: &PresetMap) -> Result<PresetMap, AppError> {
        Ok(merge_presets(&default_presets(), &self.global.load()?, local))
    }

    /// 現在の segments/config を名前付きで保存し、trim 済みの名前を返す
    pub fn save(
        &self,
        presets: &mut PresetMap,
        name: &str,
        segments: &[Segment],
        config: &PathConfig,
    ) -> Result<(String, SaveOutcome), AppError> {
        let name = validate_preset_name(name)?;
        let preset = Preset::snapshot(segments, config);

        self.global.upsert(&name, &preset)?;

        let outcome = match presets.insert(name.clone(), preset) {
            Some(_) => SaveOutcome::Updated,
            None => SaveOutcome::Created,
        };
        log::info!("プリセット保存: \"{name}\" ({outcome:?})");
        Ok((name, outcome))
    }

    /// ディープコピーを返す
    pub fn load(&self, presets: &PresetMap, name: &str) -> Result<Preset, AppError> {
        presets
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Preset \"{name}\" not found")))
    }

    pub fn delete(&self, presets: &mut PresetMap, name: &str) -> Result<Preset, AppError> {
        if is_default_preset(name) {
            return Err(AppError::protected_preset(name));
        }
        if !presets.contains_key(name) {
            return Err(AppError::not_found(format!("Preset \"{name}\" not found")));
        }

        self.global.remove(&[name.to_string()])?;

        let removed = presets
            .remove(name)
            .ok_or_else(|| AppError::not_found(format!("Preset \"{name}\" not found")))?;
        log::info!("プリセット削除: \"{name}\"");
        Ok(removed)
    }

    /// 一括削除。組み込みは名前ごとに除外し、残りを削除する。
    pub fn delete_many(
        &self,
        presets: &mut PresetMap,
        names: &[String],
    ) -> Result<BatchDelete, AppError> {
        let mut result = BatchDelete::default();
        for name in names {
            if is_default_preset(name) {
                if !result.protected.contains(name) {
                    result.protected.push(name.clone());
                }
            } else if presets.contains_key(name) && !result.removed.contains(name) {
                result.removed.push(name.clone());
            }
        }
        if !result.protected.is_empty() {
            log::warn!("組み込みプリセットは削除できません: {:?}", result.protected);
        }
        if result.removed.is_empty() {
            return Ok(result);
        }

        self.global.remove(&result.removed)?;
        for name in &result.removed {
            presets.remove(name);
        }
        log::info!("プリセット一括削除: {} 件", result.removed.len());
        Ok(result)
    }

    pub fn load_global(&self) -> Result<PresetMap, AppError> {
        Ok(self.global.load()?)
    }

    /// 他のタブで追加されたグローバルプリセットを取り込む（追加のみ）
    pub fn refresh(&self, presets: &mut PresetMap) -> Result<Vec<String>, AppError> {
        Ok(absorb_new(presets, self.load_global()?))
    }

    /// 同名エントリで上書きされた組み込みプリセットを元に戻す
    pub fn reset_default(&self, presets: &mut PresetMap, name: &str) -> Result<Preset, AppError> {
        let builtin = builtin_presets()
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| AppError::not_found(format!("\"{name}\" is not a default preset")))?;
        if !builtin.resettable {
            return Err(AppError::invalid_state(format!(
                "Default preset \"{name}\" cannot be reset"
            )));
        }

        self.global.remove(&[name.to_string()])?;
        presets.insert(name.to_string(), builtin.preset.clone());
        Ok(builtin.preset)
    }
}
