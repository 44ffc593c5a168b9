//! `{{char_<slot>}}` / `{{user_<slot>}}` macro resolution.

use crate::slots::{OwnerKind, Slot, NONE_VALUE};
use crate::state::OutfitInstance;

/// Replace outfit macros with current slot values.
///
/// `char` resolves against `bot`, `user` against `user`; a missing instance
/// resolves to `"None"`. Unknown tags, unknown slots, and unterminated
/// spans are left verbatim.
pub fn resolve_macros(
    text: &str,
    bot: Option<&OutfitInstance>,
    user: Option<&OutfitInstance>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let body = &rest[open + 2..];
        let Some(close) = body.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };

        let inner = &body[..close];
        match lookup(inner, bot, user) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str("{{");
                out.push_str(inner);
                out.push_str("}}");
            }
        }
        rest = &body[close + 2..];
    }

    out.push_str(rest);
    out
}

fn lookup<'a>(
    inner: &str,
    bot: Option<&'a OutfitInstance>,
    user: Option<&'a OutfitInstance>,
) -> Option<&'a str> {
    let (tag, slot_name) = inner.split_once('_')?;
    let slot = Slot::parse(slot_name)?;
    let instance = match tag.trim() {
        t if t == OwnerKind::Bot.macro_tag() => bot,
        t if t == OwnerKind::User.macro_tag() => user,
        _ => return None,
    };
    Some(instance.map_or(NONE_VALUE, |i| i.get(slot)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_both_owners() {
        let mut bot = OutfitInstance::new();
        bot.set(Slot::Topwear, "red jacket");
        let mut user = OutfitInstance::new();
        user.set(Slot::NeckAccessory, "scarf");

        let text = "She wears {{char_topwear}}; you wear {{user_neck-accessory}}.";
        assert_eq!(
            resolve_macros(text, Some(&bot), Some(&user)),
            "She wears red jacket; you wear scarf."
        );
    }

    #[test]
    fn test_missing_instance_reads_none() {
        assert_eq!(resolve_macros("{{user_headwear}}", None, None), "None");
    }

    #[test]
    fn test_unknown_macros_left_alone() {
        let text = "{{char}} {{char_cape}} {{npc_topwear}} {{char_topwear";
        assert_eq!(resolve_macros(text, None, None), text);
    }
}
