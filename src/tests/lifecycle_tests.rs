use super::*;

fn workspace(status: ContainerStatus, url: Option<&str>) -> Workspace {
    Workspace {
        id: WorkspaceId::new("ws1"),
        name: "demo".to_string(),
        owner_username: "alice".to_string(),
        container_status: status,
        container_url: url.map(str::to_string),
        container_password: None,
        resource_usage: None,
        git_template_details: None,
        created_at: None,
        last_accessed: None,
    }
}

#[test]
fn running_workspace_opens_only_once() {
    let launched = Mutex::new(HashSet::new());
    let opener = RecordingOpener::new();
    let ws = workspace(ContainerStatus::Running, Some("https://ws1.example"));

    assert!(launch_once(&launched, &opener, &ws, None));
    assert!(!launch_once(&launched, &opener, &ws, None));
    assert_eq!(opener.opened(), vec!["https://ws1.example".to_string()]);
}

#[test]
fn missing_or_empty_url_opens_nothing() {
    let launched = Mutex::new(HashSet::new());
    let opener = RecordingOpener::new();

    let no_url = workspace(ContainerStatus::Running, None);
    assert!(!launch_once(&launched, &opener, &no_url, None));
    let empty = workspace(ContainerStatus::Running, Some(""));
    assert!(!launch_once(&launched, &opener, &empty, None));

    assert!(opener.opened().is_empty());
    assert!(launched.lock().unwrap().is_empty());
}

#[test]
fn not_running_workspace_is_not_opened() {
    let launched = Mutex::new(HashSet::new());
    let opener = RecordingOpener::new();
    let ws = workspace(ContainerStatus::Starting, Some("https://ws1.example"));

    assert!(!launch_once(&launched, &opener, &ws, None));
    assert!(opener.opened().is_empty());
}

#[test]
fn cancelled_poll_does_not_open() {
    let launched = Mutex::new(HashSet::new());
    let opener = RecordingOpener::new();
    let ws = workspace(ContainerStatus::Running, Some("https://ws1.example"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(!launch_once(&launched, &opener, &ws, Some(&cancel)));
    assert!(opener.opened().is_empty());
    assert!(!launched.lock().unwrap().contains(&ws.id));
}

#[test]
fn only_waiting_is_non_terminal() {
    assert!(!StartupPhase::Waiting(ContainerStatus::Starting).is_terminal());
    assert!(!StartupPhase::Waiting(ContainerStatus::Stopped).is_terminal());
    assert!(StartupPhase::Ready { opened: true }.is_terminal());
    assert!(StartupPhase::Failed.is_terminal());
    assert!(StartupPhase::Abandoned.is_terminal());
    assert!(StartupPhase::TimedOut.is_terminal());
}

#[test]
fn default_view_is_waiting_for_start() {
    let view = StartupView::default();
    assert_eq!(view.phase, StartupPhase::Waiting(ContainerStatus::Starting));
    assert_eq!(view.polls, 0);
    assert!(view.workspace.is_none());
}
