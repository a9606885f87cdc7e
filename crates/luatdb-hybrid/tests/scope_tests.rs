use luatdb_hybrid::select_titles;

fn titles(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn penalty_query_restricts_to_sorted_penalty_titles_capped_at_two() {
    let available = titles(&["xu_phat_giao_thong", "xu_phat_an_ninh", "hon_nhan"]);
    let chosen = select_titles("mức phạt vượt đèn đỏ là bao nhiêu", &available);
    assert_eq!(chosen, titles(&["xu_phat_an_ninh", "xu_phat_giao_thong"]));
}

#[test]
fn penalty_rule_short_circuits_category_rules() {
    // "xử phạt" also matches the giao_thong category rule; the penalty
    // prefix rule must win when penalty titles exist.
    let available = titles(&["xu_phat_an_ninh", "giao_thong_duong_bo"]);
    let chosen = select_titles("xử phạt nồng độ cồn", &available);
    assert_eq!(chosen, titles(&["xu_phat_an_ninh"]));
}

#[test]
fn penalty_query_without_penalty_titles_falls_back_to_categories() {
    let available = titles(&["giao_thong_duong_bo", "hon_nhan"]);
    let chosen = select_titles("mức phạt khi vượt đèn đỏ", &available);
    assert_eq!(chosen, titles(&["giao_thong_duong_bo"]));
}

#[test]
fn category_rules_respect_availability_and_first_seen_order() {
    let available = titles(&["dat_dai", "hon_nhan", "lao_dong"]);
    let chosen = select_titles("tranh chấp đất đai sau ly hôn", &available);
    assert_eq!(chosen, titles(&["dat_dai", "hon_nhan"]));

    // Title missing from the corpus contributes nothing.
    let available = titles(&["hon_nhan"]);
    let chosen = select_titles("tranh chấp đất đai sau ly hôn", &available);
    assert_eq!(chosen, titles(&["hon_nhan"]));
}

#[test]
fn result_is_capped_at_two_titles() {
    let available = titles(&["so_huu_tri_tue", "dat_dai", "lao_dong", "hon_nhan"]);
    let chosen = select_titles("nhãn hiệu trên sổ đỏ khi sa thải và ly hôn", &available);
    assert_eq!(chosen.len(), 2);
    assert_eq!(chosen, titles(&["so_huu_tri_tue", "dat_dai"]));
}

#[test]
fn fails_open_when_no_rule_fires() {
    let available = titles(&["hon_nhan", "dat_dai"]);
    assert!(select_titles("thủ tục thành lập doanh nghiệp", &available).is_empty());
    assert!(select_titles("", &available).is_empty());
    assert!(select_titles("ly hôn", &[]).is_empty());
}
