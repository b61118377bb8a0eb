//! LocalExecutor - 로컬 액션 실행기
//!
//! shell 액션은 직접 실행하고, GUI 자동화 액션(click/type 등)은 설정된
//! 외부 자동화 헬퍼 커맨드에 위임합니다. OS 자동화 프리미티브 자체는
//! 외부 협력자입니다.

use super::{Action, ActionExecutor, ExecStep, StepStream};
use async_stream::try_stream;
use deskpilot_foundation::{Error, Result};
use futures::StreamExt;
use tracing::{debug, warn};

/// shell 계열 액션 이름
const SHELL_ACTIONS: &[&str] = &["shell", "bash", "command"];

/// 로컬 실행기
pub struct LocalExecutor {
    /// GUI 자동화 헬퍼 커맨드 (없으면 GUI 액션 미실행)
    automation_command: Option<String>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self {
            automation_command: None,
        }
    }

    /// 자동화 헬퍼 커맨드 설정
    pub fn with_automation_command(mut self, command: impl Into<String>) -> Self {
        self.automation_command = Some(command.into());
        self
    }

    /// shell 커맨드 실행, (출력, 성공 여부) 반환
    async fn run_shell(&self, command: &str) -> Result<(String, bool)> {
        let parts = shlex::split(command)
            .ok_or_else(|| Error::action_execution("shell", "Cannot parse command line"))?;
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| Error::action_execution("shell", "Empty command"))?;

        debug!(program = %program, "Running shell action");

        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::action_execution("shell", e.to_string()))?;

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.stderr.is_empty() {
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        let clean = strip_ansi_escapes::strip_str(&text);
        Ok((clean, output.status.success()))
    }

    /// GUI 액션을 자동화 헬퍼에 위임
    async fn run_automation(&self, action: &Action) -> Result<(String, bool)> {
        let helper = match &self.automation_command {
            Some(cmd) => cmd.clone(),
            None => {
                warn!(action = %action.name, "No automation helper configured");
                return Ok((
                    format!("Error: no automation helper for action '{}'", action.name),
                    false,
                ));
            }
        };

        let payload = serde_json::to_string(action)?;
        let output = tokio::process::Command::new(&helper)
            .arg(&payload)
            .output()
            .await
            .map_err(|e| Error::action_execution(&action.name, e.to_string()))?;

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        Ok((text, output.status.success()))
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor for LocalExecutor {
    fn execute(&self, action: Action) -> StepStream<'_> {
        try_stream! {
            // 1단계: 결정된 액션을 렌더링 (실행 전에 기록이 남도록)
            yield ExecStep::rendered(format!("Next action: {}", action.input));

            // 2단계: 실행 후 도구 결과
            let (output, ok) = if SHELL_ACTIONS.contains(&action.name.as_str()) {
                let command = action.input["command"]
                    .as_str()
                    .or_else(|| action.input.as_str())
                    .unwrap_or_default()
                    .to_string();
                self.run_shell(&command).await?
            } else {
                self.run_automation(&action).await?
            };

            let rendered = if ok {
                output.clone()
            } else {
                format!("Error: {}", output)
            };
            yield ExecStep::with_result(rendered, output);
        }
        .boxed()
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn collect(executor: &LocalExecutor, action: Action) -> Vec<ExecStep> {
        let mut steps = Vec::new();
        let mut stream = executor.execute(action);
        while let Some(step) = stream.next().await {
            steps.push(step.unwrap());
        }
        steps
    }

    #[tokio::test]
    async fn test_shell_action_yields_render_then_result() {
        let executor = LocalExecutor::new();
        let action = Action::new("shell", json!({"command": "echo hello"}));

        let steps = collect(&executor, action).await;
        assert_eq!(steps.len(), 2);
        assert!(steps[0].rendered.starts_with("Next action:"));
        assert!(steps[0].tool_result.is_none());
        assert_eq!(steps[1].tool_result.as_deref().map(str::trim), Some("hello"));
    }

    #[tokio::test]
    async fn test_gui_action_without_helper_reports_error() {
        let executor = LocalExecutor::new();
        let action = Action::new("left_click", json!({"coordinate": [10, 20]}));

        let steps = collect(&executor, action).await;
        assert_eq!(steps.len(), 2);
        let result = steps[1].tool_result.as_deref().unwrap();
        assert!(result.starts_with("Error:"));
    }
}
