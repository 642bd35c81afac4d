use poise::serenity_prelude::ReactionType;

macro_rules! define_symbol_constants {
    ($($name:ident => $value:expr),*) => {
        $(
            pub struct $name;

            impl $name {
                pub const STR: &'static str = $value;

                #[must_use] pub fn reaction() -> ReactionType {
                    ReactionType::Unicode($value.to_owned())
                }
            }
        )*
    };
}

define_symbol_constants! {
    Question => "❓",
    Checkmark => "✅",
    X => "❌",
    Hourglass => "⏳",
    Coin => "🪙",
    Star => "⭐"
}
