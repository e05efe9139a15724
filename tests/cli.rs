use clap::Parser;
use pgpmail::cli::{AuthCommand, Cli, Command};

#[test]
fn parses_auth_logout() {
    let cli = Cli::try_parse_from(["pgpmail", "auth", "logout"]).expect("cli parse should work");
    match cli.command {
        Command::Auth(auth) => assert!(matches!(auth.command, AuthCommand::Logout)),
        _ => panic!("expected auth command"),
    }
}

#[test]
fn parses_read_with_global_flags() {
    let cli = Cli::try_parse_from(["pgpmail", "read", "t1", "--json", "-vv", "--profile", "work"])
        .expect("cli parse should work");
    assert!(cli.json);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.profile, "work");
    match cli.command {
        Command::Read(read) => assert_eq!(read.thread_id, "t1"),
        _ => panic!("expected read command"),
    }
}

#[test]
fn parses_send_with_comma_separated_recipients() {
    let cli = Cli::try_parse_from([
        "pgpmail",
        "send",
        "--to",
        "b@x.com,c@x.com",
        "--subj",
        "hi",
        "--body",
        "hello",
        "--thread",
        "t9",
        "--attach",
        "a.png",
        "--attach",
        "b.txt",
    ])
    .expect("cli parse should work");
    match cli.command {
        Command::Send(send) => {
            assert_eq!(send.to, ["b@x.com", "c@x.com"]);
            assert_eq!(send.subject.as_deref(), Some("hi"));
            assert_eq!(send.thread.as_deref(), Some("t9"));
            assert_eq!(send.attach.len(), 2);
        }
        _ => panic!("expected send command"),
    }
}

#[test]
fn send_requires_recipients() {
    assert!(Cli::try_parse_from(["pgpmail", "send", "--body", "hello"]).is_err());
}

#[test]
fn parses_threads_defaults() {
    let cli = Cli::try_parse_from(["pgpmail", "threads"]).expect("cli parse should work");
    match cli.command {
        Command::Threads(threads) => assert_eq!(threads.limit, 20),
        _ => panic!("expected threads command"),
    }
}

#[test]
fn trash_takes_several_threads() {
    let cli = Cli::try_parse_from(["pgpmail", "trash", "t1", "t2"]).expect("cli parse should work");
    match cli.command {
        Command::Trash(trash) => assert_eq!(trash.thread_ids, ["t1", "t2"]),
        _ => panic!("expected trash command"),
    }
}

#[test]
fn contacts_prefix_is_optional() {
    let cli = Cli::try_parse_from(["pgpmail", "contacts"]).expect("cli parse should work");
    match cli.command {
        Command::Contacts(contacts) => {
            assert_eq!(contacts.prefix, "");
            assert_eq!(contacts.limit, 10);
        }
        _ => panic!("expected contacts command"),
    }
}
