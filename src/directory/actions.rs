//! The scheduled-action catalog: one operation per `LifecycleAction`,
//! composed from `DirectoryGateway` calls and dispatched through a single
//! match. Each operation reports an outcome instead of throwing past its
//! siblings; the engine turns gateway errors into per-action failures.

use rand::seq::SliceRandom;
use rand::Rng;
use zeroize::Zeroizing;

use crate::auth::AccessToken;
use crate::directory::{group_skip_reason, DirectoryGateway, DirectoryResult};
use crate::model::{ActionParams, LifecycleAction, TargetUser};

/// Outcome of one catalog operation that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The operation took effect; `detail` describes what happened.
    Success(String),
    /// The operation was not applicable to this target; `reason` says why.
    Skipped(String),
}

/// Run one catalog action against the target user.
pub async fn run_action(
    action: LifecycleAction,
    gateway: &dyn DirectoryGateway,
    target: &TargetUser,
    params: &ActionParams,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    match action {
        LifecycleAction::DisableAccount => disable_account(gateway, target, token).await,
        LifecycleAction::ResetPassword => reset_password(gateway, target, token).await,
        LifecycleAction::RevokeAccess => revoke_access(gateway, target, token).await,
        LifecycleAction::RevokeLicenses => revoke_licenses(gateway, target, token).await,
        LifecycleAction::RemoveFromGroups => remove_from_groups(gateway, target, token).await,
        LifecycleAction::RemoveFromTeams => remove_from_teams(gateway, target, token).await,
        LifecycleAction::RemoveAppAccess => remove_app_access(gateway, target, token).await,
        LifecycleAction::RemoveAuthMethods => remove_auth_methods(gateway, target, token).await,
        LifecycleAction::ConvertToSharedMailbox => {
            convert_to_shared_mailbox(gateway, target, token).await
        }
        LifecycleAction::SetEmailForwarding => {
            set_email_forwarding(gateway, target, params, token).await
        }
        LifecycleAction::SetAutoReply => set_auto_reply(gateway, target, params, token).await,
        LifecycleAction::BackupData => backup_data(gateway, target, params, token).await,
        LifecycleAction::TransferFiles => transfer_files(gateway, target, params, token).await,
        LifecycleAction::WipeDevices => wipe_devices(gateway, target, token).await,
        LifecycleAction::RetireDevices => retire_devices(gateway, target, token).await,
        LifecycleAction::RemoveApps => remove_apps(gateway, target, token).await,
    }
}

async fn disable_account(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    gw.disable_sign_in(&target.id, token).await?;
    Ok(ActionOutcome::Success("sign-in disabled".to_string()))
}

/// Rotate the credential to a random value. The value exists only for the
/// duration of the call and is never logged or recorded.
async fn reset_password(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let password = generate_password();
    gw.set_password(&target.id, &password, token).await?;
    Ok(ActionOutcome::Success(
        "credential rotated to a random value".to_string(),
    ))
}

async fn revoke_access(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    gw.revoke_sessions(&target.id, token).await?;
    Ok(ActionOutcome::Success(
        "all active sessions revoked".to_string(),
    ))
}

async fn revoke_licenses(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let skus = gw.assigned_licenses(&target.id, token).await?;
    if skus.is_empty() {
        return Ok(ActionOutcome::Success("no licenses assigned".to_string()));
    }
    gw.remove_licenses(&target.id, &skus, token).await?;
    Ok(ActionOutcome::Success(format!(
        "removed {} license(s)",
        skus.len()
    )))
}

/// Remove assigned group memberships. Mail-enabled, on-premises-synced, and
/// dynamic groups are never touched; each is skipped with its reason. The
/// action as a whole is skipped only when nothing was removable.
async fn remove_from_groups(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let groups = gw.member_groups(&target.id, token).await?;
    if groups.is_empty() {
        return Ok(ActionOutcome::Success("no group memberships".to_string()));
    }

    let mut skip_reasons = Vec::new();
    let mut removed = 0usize;
    for group in &groups {
        match group_skip_reason(group) {
            Some(reason) => skip_reasons.push(reason),
            None => {
                gw.remove_group_member(&group.id, &target.id, token).await?;
                removed += 1;
            }
        }
    }

    if removed == 0 {
        return Ok(ActionOutcome::Skipped(format!(
            "no removable groups: {}",
            skip_reasons.join("; ")
        )));
    }
    let detail = if skip_reasons.is_empty() {
        format!("removed from {removed} group(s)")
    } else {
        format!(
            "removed from {removed} group(s); skipped {}: {}",
            skip_reasons.len(),
            skip_reasons.join("; ")
        )
    };
    Ok(ActionOutcome::Success(detail))
}

async fn remove_from_teams(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let teams = gw.joined_teams(&target.id, token).await?;
    if teams.is_empty() {
        return Ok(ActionOutcome::Success("no team memberships".to_string()));
    }
    for team in &teams {
        gw.remove_team_member(&team.id, &target.id, token).await?;
    }
    Ok(ActionOutcome::Success(format!(
        "removed from {} team(s)",
        teams.len()
    )))
}

async fn remove_app_access(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let assignments = gw.app_assignments(&target.id, token).await?;
    if assignments.is_empty() {
        return Ok(ActionOutcome::Success(
            "no application role assignments".to_string(),
        ));
    }
    for assignment in &assignments {
        gw.remove_app_assignment(&target.id, &assignment.id, token)
            .await?;
    }
    Ok(ActionOutcome::Success(format!(
        "removed {} application role assignment(s)",
        assignments.len()
    )))
}

async fn remove_auth_methods(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let methods = gw.auth_methods(&target.id, token).await?;
    if methods.is_empty() {
        return Ok(ActionOutcome::Success(
            "no registered auth methods".to_string(),
        ));
    }
    for method in &methods {
        gw.delete_auth_method(&target.id, &method.id, token).await?;
    }
    Ok(ActionOutcome::Success(format!(
        "removed {} auth method(s)",
        methods.len()
    )))
}

async fn convert_to_shared_mailbox(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    gw.convert_to_shared_mailbox(&target.id, token).await?;
    Ok(ActionOutcome::Success(
        "mailbox converted to shared".to_string(),
    ))
}

async fn set_email_forwarding(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    params: &ActionParams,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    // Explicit recipient wins; otherwise fall back to the manager snapshot.
    let recipient = params
        .forward_to
        .as_deref()
        .or(target.manager_mail.as_deref());
    let Some(recipient) = recipient else {
        return Ok(ActionOutcome::Skipped(
            "no forwarding recipient configured and target has no manager".to_string(),
        ));
    };
    gw.set_mail_forwarding(&target.id, recipient, token).await?;
    Ok(ActionOutcome::Success(format!(
        "mail forwarding set to {recipient}"
    )))
}

async fn set_auto_reply(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    params: &ActionParams,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let Some(message) = params.auto_reply_message.as_deref() else {
        return Ok(ActionOutcome::Skipped(
            "no auto-reply message configured".to_string(),
        ));
    };
    gw.set_auto_reply(&target.id, message, token).await?;
    Ok(ActionOutcome::Success("auto-reply configured".to_string()))
}

async fn backup_data(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    params: &ActionParams,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let Some(destination) = params.backup_destination.as_deref() else {
        return Ok(ActionOutcome::Skipped(
            "no backup destination configured".to_string(),
        ));
    };
    gw.archive_drive(&target.id, destination, token).await?;
    Ok(ActionOutcome::Success(format!(
        "file storage archived to {destination}"
    )))
}

async fn transfer_files(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    params: &ActionParams,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let recipient = params
        .transfer_to
        .as_deref()
        .or(target.manager_mail.as_deref());
    let Some(recipient) = recipient else {
        return Ok(ActionOutcome::Skipped(
            "no transfer recipient configured and target has no manager".to_string(),
        ));
    };
    gw.transfer_drive_ownership(&target.id, recipient, token)
        .await?;
    Ok(ActionOutcome::Success(format!(
        "file ownership transferred to {recipient}"
    )))
}

async fn wipe_devices(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let devices = gw.managed_devices(&target.id, token).await?;
    if devices.is_empty() {
        return Ok(ActionOutcome::Success("no managed devices".to_string()));
    }
    for device in &devices {
        gw.wipe_device(&device.id, token).await?;
    }
    Ok(ActionOutcome::Success(format!(
        "wipe issued for {} device(s)",
        devices.len()
    )))
}

async fn retire_devices(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let devices = gw.managed_devices(&target.id, token).await?;
    if devices.is_empty() {
        return Ok(ActionOutcome::Success("no managed devices".to_string()));
    }
    for device in &devices {
        gw.retire_device(&device.id, token).await?;
    }
    Ok(ActionOutcome::Success(format!(
        "retire issued for {} device(s)",
        devices.len()
    )))
}

async fn remove_apps(
    gw: &dyn DirectoryGateway,
    target: &TargetUser,
    token: &AccessToken,
) -> DirectoryResult<ActionOutcome> {
    let devices = gw.managed_devices(&target.id, token).await?;
    if devices.is_empty() {
        return Ok(ActionOutcome::Success("no managed devices".to_string()));
    }
    for device in &devices {
        gw.uninstall_managed_apps(&device.id, token).await?;
    }
    Ok(ActionOutcome::Success(format!(
        "managed app removal issued for {} device(s)",
        devices.len()
    )))
}

/// Generate a random 24-character credential with at least one character from
/// each class. Held in a zeroizing buffer so the plaintext does not linger.
fn generate_password() -> Zeroizing<String> {
    const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
    const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    const DIGIT: &[u8] = b"23456789";
    const SYMBOL: &[u8] = b"!@#$%^&*-_=+";
    const ALL: [&[u8]; 4] = [LOWER, UPPER, DIGIT, SYMBOL];

    let mut rng = rand::thread_rng();
    let mut chars: Vec<u8> = Vec::with_capacity(24);
    for class in ALL {
        chars.push(class[rng.gen_range(0..class.len())]);
    }
    while chars.len() < 24 {
        let class = ALL[rng.gen_range(0..ALL.len())];
        chars.push(class[rng.gen_range(0..class.len())]);
    }
    chars.shuffle(&mut rng);
    Zeroizing::new(String::from_utf8(chars).unwrap_or_default())
}
