use crate::utils::network::{AccessPointInfo, NetworkUtilError};

/// What the menu should show after a `Connected` result.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    Connected,
    /// Ask for a key. `retry` is set when a key for this AP was just rejected.
    PromptPassword { ap: AccessPointInfo, retry: bool },
    Failed(NetworkUtilError),
}

/// The menu's `connecting` marker and password-prompt target.
#[derive(Debug, Default)]
pub struct ConnectFlow {
    connecting: Option<String>,
    prompt: Option<AccessPointInfo>,
}

impl ConnectFlow {
    pub fn connecting(&self) -> Option<&str> {
        self.connecting.as_deref()
    }

    pub fn prompt_target(&self) -> Option<&AccessPointInfo> {
        self.prompt.as_ref()
    }

    pub fn begin(&mut self, bssid: &str) {
        self.connecting = Some(bssid.to_string());
    }

    pub fn close_prompt(&mut self) {
        self.prompt = None;
    }

    /// Resolves a finished attempt. The marker is only cleared when it still
    /// points at `bssid`; a newer attempt keeps its spinner.
    pub fn finish(
        &mut self,
        bssid: &str,
        result: Result<(), NetworkUtilError>,
        known: &[AccessPointInfo],
    ) -> ConnectOutcome {
        if self.connecting.as_deref() == Some(bssid) {
            self.connecting = None;
        }

        match result {
            Ok(()) => {
                if self.prompt.as_ref().is_some_and(|ap| ap.bssid == bssid) {
                    self.prompt = None;
                }
                ConnectOutcome::Connected
            }
            Err(NetworkUtilError::SecretsRequired) => {
                let retry = self.prompt.as_ref().is_some_and(|ap| ap.bssid == bssid);
                let ap = known
                    .iter()
                    .find(|ap| ap.bssid == bssid)
                    .cloned()
                    .or_else(|| self.prompt.clone().filter(|ap| ap.bssid == bssid));
                match ap {
                    Some(ap) => {
                        self.prompt = Some(ap.clone());
                        ConnectOutcome::PromptPassword { ap, retry }
                    }
                    None => ConnectOutcome::Failed(NetworkUtilError::SecretsRequired),
                }
            }
            Err(e) => ConnectOutcome::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::network::tests::ap;

    #[test]
    fn test_begin_sets_marker() {
        let mut flow = ConnectFlow::default();
        flow.begin("AA:BB");
        assert_eq!(flow.connecting(), Some("AA:BB"));
    }

    #[test]
    fn test_finish_clears_current_marker() {
        let mut flow = ConnectFlow::default();
        flow.begin("AA:BB");
        let outcome = flow.finish("AA:BB", Ok(()), &[]);
        assert_eq!(outcome, ConnectOutcome::Connected);
        assert_eq!(flow.connecting(), None);
    }

    #[test]
    fn test_stale_result_keeps_newer_marker() {
        let mut flow = ConnectFlow::default();
        flow.begin("AA:BB");
        flow.begin("CC:DD");
        flow.finish("AA:BB", Err(NetworkUtilError::Timeout), &[]);
        assert_eq!(flow.connecting(), Some("CC:DD"));
    }

    #[test]
    fn test_secrets_required_opens_prompt() {
        let cafe = ap(Some("Cafe"), "CC:DD", 60, false);
        let mut flow = ConnectFlow::default();
        flow.begin("CC:DD");
        let outcome = flow.finish(
            "CC:DD",
            Err(NetworkUtilError::SecretsRequired),
            std::slice::from_ref(&cafe),
        );
        assert_eq!(
            outcome,
            ConnectOutcome::PromptPassword {
                ap: cafe.clone(),
                retry: false
            }
        );
        assert_eq!(flow.prompt_target(), Some(&cafe));
        assert_eq!(flow.connecting(), None);
    }

    #[test]
    fn test_rejected_key_is_a_retry() {
        let cafe = ap(Some("Cafe"), "CC:DD", 60, false);
        let mut flow = ConnectFlow::default();
        flow.finish(
            "CC:DD",
            Err(NetworkUtilError::SecretsRequired),
            std::slice::from_ref(&cafe),
        );
        flow.begin("CC:DD");
        let outcome = flow.finish("CC:DD", Err(NetworkUtilError::SecretsRequired), &[]);
        assert_eq!(outcome, ConnectOutcome::PromptPassword { ap: cafe, retry: true });
    }

    #[test]
    fn test_secrets_for_unknown_ap_fail() {
        let mut flow = ConnectFlow::default();
        let outcome = flow.finish("EE:FF", Err(NetworkUtilError::SecretsRequired), &[]);
        assert_eq!(outcome, ConnectOutcome::Failed(NetworkUtilError::SecretsRequired));
        assert_eq!(flow.prompt_target(), None);
    }

    #[test]
    fn test_success_closes_prompt_for_that_ap() {
        let cafe = ap(Some("Cafe"), "CC:DD", 60, false);
        let mut flow = ConnectFlow::default();
        flow.finish(
            "CC:DD",
            Err(NetworkUtilError::SecretsRequired),
            std::slice::from_ref(&cafe),
        );
        assert_eq!(flow.finish("CC:DD", Ok(()), &[]), ConnectOutcome::Connected);
        assert_eq!(flow.prompt_target(), None);
    }

    #[test]
    fn test_other_errors_leave_prompt_alone() {
        let cafe = ap(Some("Cafe"), "CC:DD", 60, false);
        let mut flow = ConnectFlow::default();
        flow.finish(
            "CC:DD",
            Err(NetworkUtilError::SecretsRequired),
            std::slice::from_ref(&cafe),
        );
        let outcome = flow.finish("CC:DD", Err(NetworkUtilError::Timeout), &[]);
        assert_eq!(outcome, ConnectOutcome::Failed(NetworkUtilError::Timeout));
        assert_eq!(flow.prompt_target(), Some(&cafe));
    }
}
