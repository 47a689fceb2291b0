//! 配置校验模块
//!
//! 校验规则：
//! - reset_matrix 为合法齐次矩阵 (末行 [0,0,0,1]，数值有限)
//! - 至少一个相机、一个扇区
//! - 扇区参数满足 `validator` 规则 (width/height/focal/scale/cams)
//! - 扇区引用的相机都在 cameras_locations 中，且不重复

use std::collections::HashSet;

use contracts::{ContractError, RigConfig, SectorSetup};
use validator::{Validate, ValidationErrors};

/// 校验 RigConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(rig: &RigConfig) -> Result<(), ContractError> {
    validate_reset_matrix(rig)?;
    validate_camera_locations(rig)?;
    validate_sectors(rig)?;
    validate_camera_refs(rig)?;
    Ok(())
}

/// 校验重置矩阵
fn validate_reset_matrix(rig: &RigConfig) -> Result<(), ContractError> {
    if rig.reset_matrix.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ContractError::config_validation(
            "reset_matrix",
            "all entries must be finite",
        ));
    }
    if rig.reset_matrix[3] != [0.0, 0.0, 0.0, 1.0] {
        return Err(ContractError::config_validation(
            "reset_matrix",
            format!("bottom row must be [0, 0, 0, 1], got {:?}", rig.reset_matrix[3]),
        ));
    }
    Ok(())
}

/// 校验相机平移
fn validate_camera_locations(rig: &RigConfig) -> Result<(), ContractError> {
    if rig.cameras_locations.is_empty() {
        return Err(ContractError::config_validation(
            "cameras_locations",
            "at least one camera is required",
        ));
    }
    for (name, translation) in &rig.cameras_locations {
        if translation.iter().any(|v| !v.is_finite()) {
            return Err(ContractError::config_validation(
                format!("cameras_locations.{name}"),
                "translation must be finite",
            ));
        }
    }
    Ok(())
}

/// 校验扇区参数
fn validate_sectors(rig: &RigConfig) -> Result<(), ContractError> {
    if rig.views.is_empty() {
        return Err(ContractError::config_validation(
            "views",
            "at least one sector is required",
        ));
    }
    for (name, setup) in &rig.views {
        if name.is_empty() {
            return Err(ContractError::config_validation(
                "views",
                "sector name cannot be empty",
            ));
        }
        setup
            .validate()
            .map_err(|errors| first_field_error(name, &errors))?;
        validate_sector_angles(name, setup)?;
    }
    Ok(())
}

fn validate_sector_angles(name: &str, setup: &SectorSetup) -> Result<(), ContractError> {
    if setup
        .rotation_to_main
        .iter()
        .chain(setup.origin.iter())
        .any(|v| !v.is_finite())
    {
        return Err(ContractError::config_validation(
            format!("views.{name}"),
            "R_to_main and origin must be finite",
        ));
    }
    Ok(())
}

/// `ValidationErrors` → 第一个字段错误
fn first_field_error(sector: &str, errors: &ValidationErrors) -> ContractError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.first() {
        Some((field, field_errors)) => {
            let message = field_errors
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("invalid value for {field}"));
            ContractError::config_validation(format!("views.{sector}.{field}"), message)
        }
        None => ContractError::config_validation(format!("views.{sector}"), errors.to_string()),
    }
}

/// 校验扇区引用的相机
fn validate_camera_refs(rig: &RigConfig) -> Result<(), ContractError> {
    for (name, setup) in &rig.views {
        let mut seen = HashSet::new();
        for cam in &setup.cams {
            if !rig.cameras_locations.contains_key(cam) {
                return Err(ContractError::config_validation(
                    format!("views.{name}.cams"),
                    format!("camera '{cam}' not found in cameras_locations"),
                ));
            }
            if !seen.insert(cam) {
                return Err(ContractError::config_validation(
                    format!("views.{name}.cams"),
                    format!("duplicate camera '{cam}'"),
                ));
            }
        }
    }
    Ok(())
}
