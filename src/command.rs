use std::str::FromStr;

use anyhow::anyhow;

pub const HELP: &str = "Commands:
  buy <amount>        buy tokens at the current price
  send <eth>          send ETH to the sale for as many tokens as it buys
  reload | retry      read the sale state again
  set-price <eth>     change the token price (sale owner only)
  finalize            end the sale (sale owner only)
  help                show this message
  quit                exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Buy(String),
    SendEth(String),
    Reload,
    SetPrice(String),
    Finalize,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| anyhow!("Empty command"))?
            .to_lowercase();
        let arg = parts.next().map(str::to_string);
        if parts.next().is_some() {
            return Err(anyhow!("Too many arguments for `{}`", name));
        }

        let need_arg = |arg: Option<String>| arg.ok_or_else(|| anyhow!("`{}` needs an amount", name));

        let command = match name.as_str() {
            "buy" => Command::Buy(need_arg(arg)?),
            "send" => Command::SendEth(need_arg(arg)?),
            "set-price" | "setprice" => Command::SetPrice(need_arg(arg)?),
            "reload" | "retry" | "refresh" if arg.is_none() => Command::Reload,
            "finalize" if arg.is_none() => Command::Finalize,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "reload" | "retry" | "refresh" | "finalize" => {
                return Err(anyhow!("`{}` takes no arguments", name))
            }
            _ => return Err(anyhow!("Unknown command `{}`; type `help`", name)),
        };

        Ok(command)
    }
}
