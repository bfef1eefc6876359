use clap::ValueEnum;

/// High level commands accepted on the command line.
///
/// Several commands can be combined; each enables a set of workflow phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Command {
    /// Cut a release branch, create the release task and link its tasks
    Prepare,
    /// Cut a hotfix branch from the given pull requests and link its tasks
    Hotfix,
    /// Create (or find) the release task and link the release branch tasks
    MakeTask,
    /// Cut the release branch only
    MakeBranch,
    /// Cut the hotfix branch only
    MakeHotfixBranch,
    /// Link release branch tasks to the release task
    MakeLinks,
    /// Merge, tag and close the release
    Finish,
    MarkChildrenTasksDone,
    MarkReleaseTaskDone,
    /// Merge the release into stable and stable into develop
    MergeRelease,
    MergeToMaster,
    MergeMasterToDevelop,
}

/// Workflow phases enabled by a set of commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Plan {
    pub release_bump: bool,
    pub hotfix_bump: bool,
    pub clean_tree: bool,
    pub tracker_version: bool,
    pub release_task: bool,
    pub release_branch: bool,
    pub hotfix_branch: bool,
    pub links: bool,
    pub merge_to_master: bool,
    pub merge_to_develop: bool,
    pub release_task_done: bool,
    pub children_done: bool,
}

impl Plan {
    pub fn from_commands(commands: &[Command]) -> Self {
        use Command::*;

        let any = |set: &[Command]| commands.iter().any(|c| set.contains(c));

        Plan {
            release_bump: any(&[Prepare, MakeBranch]),
            hotfix_bump: any(&[Hotfix, MakeHotfixBranch]),
            clean_tree: any(&[
                Prepare,
                MakeBranch,
                Hotfix,
                MakeHotfixBranch,
                Finish,
                MergeRelease,
                MergeToMaster,
                MergeMasterToDevelop,
            ]),
            tracker_version: any(&[Prepare, Hotfix, MakeLinks]),
            release_task: any(&[
                Prepare,
                Hotfix,
                MakeTask,
                Finish,
                MakeLinks,
                MarkChildrenTasksDone,
                MarkReleaseTaskDone,
            ]),
            release_branch: any(&[Prepare, MakeBranch]),
            hotfix_branch: any(&[Hotfix, MakeHotfixBranch]),
            links: any(&[Prepare, Hotfix, MakeTask, MakeLinks]),
            merge_to_master: any(&[Finish, MergeRelease, MergeToMaster]),
            merge_to_develop: any(&[Finish, MergeRelease, MergeMasterToDevelop]),
            release_task_done: any(&[Finish, MarkReleaseTaskDone]),
            children_done: any(&[Finish, MarkChildrenTasksDone]),
        }
    }

    /// Whether any phase talks to the issue tracker
    pub fn needs_tracker(&self) -> bool {
        self.tracker_version || self.release_task || self.links
    }

    /// Whether any phase talks to the code host
    pub fn needs_code_host(&self) -> bool {
        self.links || self.hotfix_branch
    }

    pub fn creates_branch(&self) -> bool {
        self.release_branch || self.hotfix_branch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_plan() {
        let plan = Plan::from_commands(&[Command::Prepare]);
        assert!(plan.release_bump);
        assert!(!plan.hotfix_bump);
        assert!(plan.clean_tree);
        assert!(plan.release_branch);
        assert!(plan.release_task);
        assert!(plan.links);
        assert!(!plan.merge_to_master);
        assert!(plan.needs_code_host());
    }

    #[test]
    fn test_finish_plan() {
        let plan = Plan::from_commands(&[Command::Finish]);
        assert!(!plan.release_bump);
        assert!(plan.clean_tree);
        assert!(plan.merge_to_master);
        assert!(plan.merge_to_develop);
        assert!(plan.release_task_done);
        assert!(plan.children_done);
        assert!(!plan.links);
        assert!(!plan.needs_code_host());
    }

    #[test]
    fn test_commands_combine() {
        let plan = Plan::from_commands(&[Command::MakeHotfixBranch, Command::MarkReleaseTaskDone]);
        assert!(plan.hotfix_bump);
        assert!(plan.hotfix_branch);
        assert!(plan.release_task);
        assert!(plan.release_task_done);
        assert!(!plan.tracker_version);
    }

    #[test]
    fn test_merge_only_needs_no_tracker() {
        let plan = Plan::from_commands(&[Command::MergeToMaster]);
        assert!(!plan.needs_tracker());
        assert!(!plan.needs_code_host());
        assert!(!plan.creates_branch());
    }

    #[test]
    fn test_command_names_are_kebab_case() {
        let parsed = Command::from_str("mark-children-tasks-done", false).unwrap();
        assert_eq!(parsed, Command::MarkChildrenTasksDone);
        assert_eq!(
            Command::MakeHotfixBranch
                .to_possible_value()
                .map(|v| v.get_name().to_string()),
            Some("make-hotfix-branch".to_string())
        );
    }
}
