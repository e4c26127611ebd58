/// Two-letter codes for characters that cannot appear in an identifier.
const CODES: &[(char, &str)] = &[
    ('+', "pL"), ('-', "mI"), ('*', "mU"), ('/', "dI"), ('&', "aN"), ('%', "pE"),
    ('|', "oR"), ('^', "hA"), ('>', "gR"), ('<', "lE"), ('=', "eQ"), ('~', "wA"),
    ('.', "dO"), ('(', "oP"), (')', "cP"), ('[', "oB"), (']', "cB"), ('!', "nO"),
    (',', "cO"), ('$', "dA"), (' ', "sP"), (':', "cL"), ('"', "dQ"), ('@', "aT"),
    ('\'', "sQ"), ('\\', "fI"),
];

/// Turn a type name into a string usable as part of a C++ identifier,
/// e.g. `ns::Pair<int,float>` → `nscLcLPairlEintcOfloatgR`.
pub fn mangle(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2);
    for c in name.chars() {
        match CODES.iter().find(|(from, _)| *from == c) {
            Some((_, code)) => out.push_str(code),
            None => out.push(c),
        }
    }
    out.trim_start_matches(|c: char| c.is_ascii_digit()).to_owned()
}
