use anyhow::{anyhow, bail};
use msgs::TabId;
use overlay::Key;

pub enum ConsoleCmd {
    Tabs,
    Click (TabId),
    Close (TabId),
    Goto (TabId, String),
    Action (TabId, String),
    Type (TabId, String),
    Key (TabId, Key),
    Submit { tab: TabId, close: bool },
    Shortcut (TabId, String),
    View (TabId),
    Store,
    Turn,
    Quit,
}

pub const USAGE: &str = "\
tabs                      list the tabs
click <tab>               click the toolbar action in a tab
close <tab>               close a tab
goto <tab> <url>          load a new document in a tab
action <tab> <label>      click an action button of the overlay
type <tab> <text>         type into the formula input
key <tab> <key>           press enter, shift-enter, escape, backspace, left or right
submit <tab> [close]      submit the transaction form
shortcut <tab> <command>  fire a keyboard shortcut command
view <tab>                print what the overlay shows
store                     print the snapshot store
turn                      end the turn of the current player on the game page
quit";

fn split_word(input: &str) -> (&str, &str) {
    match input.find(' ') {
        Some(i) => (&input[..i], input[i+1..].trim()),
        None => (input, ""),
    }
}

fn parse_tab(rem: &str) -> anyhow::Result<(TabId, &str)> {
    let (tab, rem) = split_word(rem);
    let tab = tab.parse::<TabId>().map_err(|_| anyhow!("expected a tab id, got {tab:?}"))?;
    Ok((tab, rem))
}

fn parse_key(name: &str) -> anyhow::Result<Key> {
    Ok(match name {
        "enter" => Key::Enter { shift: false },
        "shift-enter" => Key::Enter { shift: true },
        "escape" => Key::Escape,
        "backspace" => Key::Backspace,
        "left" => Key::Left,
        "right" => Key::Right,
        other => bail!("unknown key {other}"),
    })
}

impl ConsoleCmd {
    pub fn parse(input: &str) -> anyhow::Result<ConsoleCmd> {
        let (message_type, rem) = split_word(input);

        match message_type {
            "tabs" => Ok(ConsoleCmd::Tabs),
            "store" => Ok(ConsoleCmd::Store),
            "turn" => Ok(ConsoleCmd::Turn),
            "quit" => Ok(ConsoleCmd::Quit),
            "click" => Ok(ConsoleCmd::Click(parse_tab(rem)?.0)),
            "close" => Ok(ConsoleCmd::Close(parse_tab(rem)?.0)),
            "view" => Ok(ConsoleCmd::View(parse_tab(rem)?.0)),
            "goto" => {
                let (tab, url) = parse_tab(rem)?;
                Ok(ConsoleCmd::Goto(tab, url.to_owned()))
            }
            "action" => {
                let (tab, label) = parse_tab(rem)?;
                Ok(ConsoleCmd::Action(tab, label.to_owned()))
            }
            "type" => {
                let (tab, text) = parse_tab(rem)?;
                Ok(ConsoleCmd::Type(tab, text.to_owned()))
            }
            "key" => {
                let (tab, key) = parse_tab(rem)?;
                Ok(ConsoleCmd::Key(tab, parse_key(key)?))
            }
            "submit" => {
                let (tab, close) = parse_tab(rem)?;
                Ok(ConsoleCmd::Submit { tab, close: close == "close" })
            }
            "shortcut" => {
                let (tab, command) = parse_tab(rem)?;
                Ok(ConsoleCmd::Shortcut(tab, command.to_owned()))
            }
            _ => bail!("cmd not recognized"),
        }
    }
}
