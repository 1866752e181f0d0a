use crate::upgrade::{
    BranchSelection, CommandArg, SteamCmdOutputParser, UpdateOutputParser, branch_args,
    cache_folder, format_command_line,
};

use std::path::PathBuf;

use gsm_config::{AutoUpdateConfig, UpdateConfig};
use googletest::assert_that;
use googletest::prelude::{eq, none};

#[test]
fn given_captured_output_when_no_lines_then_not_successful() {
    let parser = SteamCmdOutputParser::new(true);

    assert_that!(parser.download_successful(), eq(false));
    assert_that!(parser.got_new_version(), eq(false));
}

#[test]
fn given_uncaptured_output_when_created_then_success_assumed() {
    let parser = SteamCmdOutputParser::new(false);

    assert_that!(parser.download_successful(), eq(true));
}

#[test]
fn given_download_and_success_lines_when_observed_then_both_flags_set() {
    // Given
    let mut parser = SteamCmdOutputParser::new(true);

    // When
    parser.observe(" Update state (0x61) downloading, progress: 3.25 (1 / 2)");
    parser.observe("Success! App '376030' fully installed.");

    // Then
    assert_that!(parser.got_new_version(), eq(true));
    assert_that!(parser.download_successful(), eq(true));
}

#[test]
fn given_success_not_at_line_start_when_observed_then_ignored() {
    // Given
    let mut parser = SteamCmdOutputParser::new(true);

    // When
    parser.observe("Update state (0x5) verifying install. Success! soon");

    // Then
    assert_that!(parser.download_successful(), eq(false));
}

#[test]
fn given_factory_when_called_then_parser_matches_capture_flag() {
    let factory = SteamCmdOutputParser::factory();

    assert_that!(factory(true).download_successful(), eq(false));
    assert_that!(factory(false).download_successful(), eq(true));
}

#[test]
fn given_indexed_format_when_formatted_then_placeholders_replaced() {
    // When
    let formatted = format_command_line(
        "+app_update {1} {0} {1} {2}",
        &[
            CommandArg::Value("beta"),
            CommandArg::Value("376030"),
            CommandArg::Fragment("-beta x validate"),
        ],
    );

    // Then
    assert_that!(
        formatted.as_str(),
        eq("+app_update 376030 beta 376030 -beta x validate")
    );
}

#[test]
fn given_awkward_values_when_formatted_then_split_returns_them_unchanged() {
    // Given
    let update = UpdateConfig::default();
    let branch = BranchSelection::new("preaquatica").with_password("it's \"secret\"");
    let branch_args = branch_args(&update, &branch);

    // When
    let formatted = format_command_line(
        "+force_install_dir \"{0}\" +app_update {1} {2} {3} +quit",
        &[
            CommandArg::Value("C:\\Games\\ARK Server\\"),
            CommandArg::Value("376030"),
            CommandArg::Fragment(&branch_args),
            CommandArg::Fragment(""),
        ],
    );

    // Then
    let words = shell_words::split(&formatted).unwrap();
    assert_that!(
        words,
        eq(&vec![
            String::from("+force_install_dir"),
            String::from("C:\\Games\\ARK Server\\"),
            String::from("+app_update"),
            String::from("376030"),
            String::from("-beta"),
            String::from("preaquatica"),
            String::from("-betapassword"),
            String::from("it's \"secret\""),
            String::from("+quit"),
        ])
    );
}

#[test]
fn given_default_branch_when_branch_args_then_empty() {
    let update = UpdateConfig::default();

    assert_that!(
        branch_args(&update, &BranchSelection::default()).as_str(),
        eq("")
    );
    assert_that!(
        branch_args(&update, &BranchSelection::new("  ")).as_str(),
        eq("")
    );
}

#[test]
fn given_branch_with_password_when_branch_args_then_both_formatted() {
    // Given
    let update = UpdateConfig::default();
    let branch = BranchSelection::new("preaquatica").with_password("secret");

    // When
    let args = branch_args(&update, &branch);

    // Then
    assert_that!(args.as_str(), eq("-beta preaquatica -betapassword secret"));
}

#[test]
fn given_blank_password_when_branch_args_then_password_omitted() {
    let branch = BranchSelection::new("preaquatica").with_password("");

    assert_that!(
        branch_args(&UpdateConfig::default(), &branch).as_str(),
        eq("-beta preaquatica")
    );
}

#[test]
fn given_cache_settings_when_cache_folder_then_prefixed_branch_folder() {
    // Given
    let auto_update = AutoUpdateConfig {
        enabled: true,
        cache_dir: String::from("/srv/cache"),
        ..AutoUpdateConfig::default()
    };
    let update = UpdateConfig::default();

    // When
    let default_branch = cache_folder(&auto_update, &update, &BranchSelection::default());
    let named = cache_folder(&auto_update, &update, &BranchSelection::new("preaquatica"));

    // Then
    assert_that!(
        default_branch,
        eq(&Some(PathBuf::from("/srv/cache/branch_public")))
    );
    assert_that!(
        named,
        eq(&Some(PathBuf::from("/srv/cache/branch_preaquatica")))
    );
}

#[test]
fn given_cache_disabled_or_unset_when_cache_folder_then_none() {
    let update = UpdateConfig::default();
    let disabled = AutoUpdateConfig {
        enabled: false,
        cache_dir: String::from("/srv/cache"),
        ..AutoUpdateConfig::default()
    };
    let unset = AutoUpdateConfig {
        enabled: true,
        ..AutoUpdateConfig::default()
    };

    assert_that!(
        cache_folder(&disabled, &update, &BranchSelection::default()),
        none()
    );
    assert_that!(
        cache_folder(&unset, &update, &BranchSelection::default()),
        none()
    );
}
